//! Program-counter-driven interpreter.
//!
//! Executes a scanned block sequence in place. Control flow is structured
//! purely by a branch-frame stack: `if`/`for` push a frame, their closers
//! pop it, and a literal block only reaches the output while the top frame
//! is taken. Loops replay their body by jumping the program counter back to
//! the `for` block; template inclusion splices a scanned sub-program into
//! the running block sequence and caches the spliced range so repeats
//! replay it instead of re-scanning.
//!
//! No condition is fatal. A statement that cannot be parsed abandons the
//! rest of its block, clears the operand stack, logs, and execution resumes
//! at the next block.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::config::{MAX_INCLUSIONS, MAX_ITERATIONS};
use crate::engine::TemplateLoader;
use crate::env::Environment;
use crate::errors::Diagnostics;
use crate::program::{BlockKind, Program};
use crate::scanner::scan;
use crate::stack::{LoopFrame, Stack};
use crate::token::{Token, TokenKind};
use crate::value::{Number, UserMap, Value};

/// Recoverable statement failure; the message is already logged.
type Fallible<T = ()> = Result<T, ()>;

/// What the main loop does after a statement.
enum Flow {
    Next,
    /// The program counter was redirected; stop this block's statements.
    Jump(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    If,
    For,
}

/// One entry of the branch stack. `taken == false` means the construct's
/// body is being skipped, which is still tracked so its closing token is
/// recognized and consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchFrame {
    pub construct: Construct,
    pub taken: bool,
}

/// One materialized inclusion, keyed by sub-program content hash.
#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    start: usize,
    end: usize,
    resume: usize,
    iterations: usize,
}

/// Cursor over one block's token sequence.
struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(Token::kind)
    }

    fn next(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.kind() == Some(kind) {
            self.pos += 1;
            return true;
        }
        false
    }

    /// The token consumed by the last `next`/`matches`.
    fn prev(&self) -> Option<&Token> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    fn prev_text(&self) -> String {
        self.prev()
            .and_then(Token::text)
            .unwrap_or_default()
            .to_string()
    }

    fn skip_all(&mut self) {
        self.pos = self.tokens.len();
    }
}

/// The interpreter for one render. Owns the environment, operand stack,
/// branch stack, loop continuations, output accumulator, and inclusion
/// cache; all of it is discarded with the value.
pub struct Interp<'a> {
    diags: &'a mut Diagnostics,
    loader: Option<&'a dyn TemplateLoader>,

    env: Environment,
    stack: Stack,
    branches: Vec<BranchFrame>,
    loops: Vec<LoopFrame>,
    out: String,
    pc: usize,
    line: u32,

    cache: FxHashMap<u64, CacheEntry>,
    hash_by_path: FxHashMap<String, u64>,
    replaying: Option<u64>,
    scan_count: usize,
}

impl<'a> Interp<'a> {
    pub fn new(diags: &'a mut Diagnostics) -> Self {
        Self {
            diags,
            loader: None,
            env: Environment::new(),
            stack: Stack::default(),
            branches: Vec::new(),
            loops: Vec::new(),
            out: String::new(),
            pc: 0,
            line: 0,
            cache: FxHashMap::default(),
            hash_by_path: FxHashMap::default(),
            replaying: None,
            scan_count: 0,
        }
    }

    pub fn with_loader(diags: &'a mut Diagnostics, loader: &'a dyn TemplateLoader) -> Self {
        let mut interp = Self::new(diags);
        interp.loader = Some(loader);
        interp
    }

    /// How many sub-templates `insert` actually scanned; repeats served
    /// from the cache do not count.
    pub fn scan_count(&self) -> usize {
        self.scan_count
    }

    /// Execute `program` against an environment seeded from `seed`,
    /// mutating the program in place when `insert` splices sub-templates.
    /// Always returns the accumulated output, even after logged errors.
    pub fn run(&mut self, program: &mut Program, seed: UserMap) -> String {
        self.env.seed(seed);
        self.pc = 0;

        while self.pc < program.len() {
            // End of a cached range being replayed: resume the outer
            // program just after the original insert site.
            if let Some(hash) = self.replaying {
                if let Some(entry) = self.cache.get(&hash) {
                    if self.pc == entry.end {
                        trace!(resume = entry.resume, "cached replay finished");
                        self.pc = entry.resume;
                        self.replaying = None;
                        continue;
                    }
                }
            }

            let Some(block) = program.get(self.pc).cloned() else {
                break;
            };
            self.line = block.line;

            match block.kind {
                BlockKind::Comment => {}
                BlockKind::Text => {
                    if self.emitting() && !block.raw.is_empty() {
                        self.out.push_str(&block.raw);
                    }
                }
                BlockKind::Code | BlockKind::Echo => {
                    let mut it = TokenCursor::new(&block.tokens);
                    let mut jumped = false;
                    while !it.is_done() {
                        match self.run_statement(&mut it, program) {
                            Ok(Flow::Next) => {}
                            Ok(Flow::Jump(target)) => {
                                self.pc = target;
                                jumped = true;
                                break;
                            }
                            Err(()) => {
                                self.diags.log(
                                    self.line,
                                    format!("statement `{}` cannot be parsed", block.raw),
                                );
                                self.stack.clear();
                                break;
                            }
                        }
                    }
                    if jumped {
                        continue;
                    }
                }
            }

            self.pc += 1;
        }

        if !self.branches.is_empty() {
            self.diags
                .log(self.line, "unterminated `if` or `for` at end of template");
            self.branches.clear();
            self.loops.clear();
        }

        std::mem::take(&mut self.out)
    }

    /// Output is live only while the innermost construct is taken.
    fn emitting(&self) -> bool {
        self.branches.last().map_or(true, |b| b.taken)
    }

    fn run_statement(&mut self, it: &mut TokenCursor, program: &mut Program) -> Fallible<Flow> {
        match it.kind() {
            Some(TokenKind::Print) => self.run_print(it).map(|_| Flow::Next),
            Some(TokenKind::For) => self.run_for(it).map(|_| Flow::Next),
            Some(TokenKind::EndFor) => self.run_endfor(it),
            Some(TokenKind::If) => self.run_if(it).map(|_| Flow::Next),
            Some(TokenKind::Elif) => self.run_elif(it).map(|_| Flow::Next),
            Some(TokenKind::Else) => self.run_else(it).map(|_| Flow::Next),
            Some(TokenKind::EndIf) => self.run_endif(it).map(|_| Flow::Next),
            Some(TokenKind::Insert) => self.run_insert(it, program),
            _ => Err(()),
        }
    }

    fn run_print(&mut self, it: &mut TokenCursor) -> Fallible {
        if !self.emitting() {
            it.skip_all();
            return Ok(());
        }

        it.next();
        if self.parse_expression(it).is_err() {
            self.out.push_str("<null>");
            return Err(());
        }
        match self.stack.pop() {
            Some(value) => {
                self.out.push_str(&value.render());
                Ok(())
            }
            None => {
                self.diags
                    .log(self.line, "print cannot evaluate its argument");
                self.out.push_str("<null>");
                Ok(())
            }
        }
    }

    // ----- if / elif / else / endif ------------------------------------

    fn run_if(&mut self, it: &mut TokenCursor) -> Fallible {
        it.next();

        if !self.emitting() {
            it.skip_all();
            self.branches.push(BranchFrame {
                construct: Construct::If,
                taken: false,
            });
            return Ok(());
        }

        // A condition that cannot be evaluated defaults to false instead of
        // aborting the block, so the matching endif still pairs up. Partial
        // parses may have pushed operands; discard them so the next
        // expression starts clean.
        let taken = if self.parse_expression(it).is_ok() {
            self.stack.pop_bool_or(false)
        } else {
            it.skip_all();
            self.stack.clear();
            false
        };
        self.branches.push(BranchFrame {
            construct: Construct::If,
            taken,
        });
        Ok(())
    }

    fn run_elif(&mut self, it: &mut TokenCursor) -> Fallible {
        match self.branches.last() {
            Some(top) if top.taken => {
                // A previous branch of this chain already matched.
                it.skip_all();
                Ok(())
            }
            Some(top) if top.construct == Construct::If => {
                // elif is else-if: replace the frame via the if handler,
                // which also consumes the elif token.
                self.branches.pop();
                self.run_if(it)
            }
            _ => {
                self.diags.log(self.line, "`elif` without a matching `if`");
                Err(())
            }
        }
    }

    fn run_else(&mut self, it: &mut TokenCursor) -> Fallible {
        it.next();
        match self.branches.last_mut() {
            Some(top) if top.construct == Construct::If => {
                top.taken = !top.taken;
                Ok(())
            }
            _ => {
                self.diags.log(self.line, "`else` without a matching `if`");
                Err(())
            }
        }
    }

    fn run_endif(&mut self, it: &mut TokenCursor) -> Fallible {
        it.next();
        match self.branches.last() {
            Some(top) if top.construct == Construct::If => {
                self.branches.pop();
                Ok(())
            }
            _ => {
                self.diags.log(self.line, "`endif` without a matching `if`");
                Err(())
            }
        }
    }

    // ----- for / endfor ------------------------------------------------

    fn push_skipped_loop(&mut self) {
        self.branches.push(BranchFrame {
            construct: Construct::For,
            taken: false,
        });
    }

    fn run_for(&mut self, it: &mut TokenCursor) -> Fallible {
        it.next();

        if !self.emitting() {
            it.skip_all();
            self.push_skipped_loop();
            return Ok(());
        }

        if !it.matches(TokenKind::Identifier) {
            self.diags.log(self.line, "loop requires an identifier");
            return Err(());
        }
        let binding = it.prev_text();
        if self.env.contains(&binding) {
            self.diags.log(
                self.line,
                format!("variable `{binding}` already exists, loop names must be unique"),
            );
            return Err(());
        }

        let mut companion = None;
        if it.matches(TokenKind::Comma) {
            if !it.matches(TokenKind::Identifier) {
                self.diags.log(self.line, "expected an identifier after `,`");
                return Err(());
            }
            companion = Some(it.prev_text());
        }
        if let Some(name) = &companion {
            if self.env.contains(name) {
                self.diags.log(
                    self.line,
                    format!("variable `{name}` already exists, loop names must be unique"),
                );
                return Err(());
            }
        }

        if !it.matches(TokenKind::In) {
            self.diags
                .log(self.line, "expected `in` after the loop identifier");
            return Err(());
        }

        if it.matches(TokenKind::Range) {
            return self.run_for_range(it, binding, companion);
        }
        if it.kind() == Some(TokenKind::Identifier) {
            it.next();
            let container = it.prev_text();
            return self.run_for_container(container, binding, companion);
        }

        self.diags.log(self.line, "invalid loop");
        Err(())
    }

    fn run_for_range(
        &mut self,
        it: &mut TokenCursor,
        binding: String,
        companion: Option<String>,
    ) -> Fallible {
        if companion.is_some() {
            self.diags
                .log(self.line, "`range` loops bind a single identifier");
            it.skip_all();
            self.push_skipped_loop();
            return Ok(());
        }

        if !it.matches(TokenKind::LParen) {
            self.diags.log(self.line, "expected `(` after `range`");
            return Err(());
        }
        for arg in 0..3 {
            self.parse_unary(it)?;
            if arg < 2 && !it.matches(TokenKind::Comma) {
                self.diags.log(self.line, "expected `,` in `range`");
                return Err(());
            }
        }
        if !it.matches(TokenKind::RParen) {
            self.diags.log(self.line, "expected closing `)`");
            return Err(());
        }

        let step = self.stack.pop_number_or(0) as i64;
        let end = self.stack.pop_number_or(0) as i64;
        let start = self.stack.pop_number_or(0) as i64;

        // Empty or direction-mismatched ranges skip the body exactly once,
        // like a false `if`.
        if step == 0 || start == end || (step > 0 && start > end) || (step < 0 && start < end) {
            self.push_skipped_loop();
            return Ok(());
        }

        let mut items: Vec<Number> = Vec::new();
        let mut value = start;
        while (step > 0 && value < end) || (step < 0 && value > end) {
            items.push(value as Number);
            if items.len() > MAX_ITERATIONS {
                self.diags.log(
                    self.line,
                    format!("loop exceeds the {MAX_ITERATIONS} iteration limit"),
                );
                self.push_skipped_loop();
                return Ok(());
            }
            value = value.wrapping_add(step);
        }

        // The materialized list lives under a hidden key for the loop's
        // lifetime; teardown erases it along with the binding.
        let container = format!("range{binding}");
        self.env.define(container.clone(), items);
        self.env.bind_element(&container, &binding, 0);
        self.loops.push(LoopFrame {
            container,
            binding,
            companion: None,
            index: 0,
            resume: self.pc,
            synthesized: true,
        });
        self.branches.push(BranchFrame {
            construct: Construct::For,
            taken: true,
        });
        Ok(())
    }

    fn run_for_container(
        &mut self,
        container: String,
        binding: String,
        companion: Option<String>,
    ) -> Fallible {
        if !self.env.contains(&container) {
            self.diags
                .log(self.line, format!("variable `{container}` is not defined"));
            self.push_skipped_loop();
            return Ok(());
        }

        let size = self.env.size_of(&container);
        if size == 0 {
            self.push_skipped_loop();
            return Ok(());
        }
        if size > MAX_ITERATIONS {
            self.diags.log(
                self.line,
                format!("loop exceeds the {MAX_ITERATIONS} iteration limit"),
            );
            self.push_skipped_loop();
            return Ok(());
        }

        match &companion {
            None => {
                if !self.env.is_list(&container) {
                    self.diags.log(
                        self.line,
                        format!("loop over map `{container}` requires `key, value` identifiers"),
                    );
                    self.push_skipped_loop();
                    return Ok(());
                }
                self.env.bind_element(&container, &binding, 0);
            }
            Some(companion) => {
                if !self.env.is_map(&container) {
                    self.diags.log(
                        self.line,
                        format!("`key, value` loops require a map, `{container}` is not one"),
                    );
                    self.push_skipped_loop();
                    return Ok(());
                }
                self.env.bind_entry(&container, &binding, companion, 0);
            }
        }

        self.loops.push(LoopFrame {
            container,
            binding,
            companion,
            index: 0,
            resume: self.pc,
            synthesized: false,
        });
        self.branches.push(BranchFrame {
            construct: Construct::For,
            taken: true,
        });
        Ok(())
    }

    fn run_endfor(&mut self, it: &mut TokenCursor) -> Fallible<Flow> {
        it.next();

        match self.branches.last() {
            // Mirrors the skip path of `for`: nothing was bound.
            Some(top) if !top.taken => {
                self.branches.pop();
                return Ok(Flow::Next);
            }
            Some(top) if top.construct == Construct::For => {}
            _ => {
                self.diags.log(self.line, "`endfor` without a matching `for`");
                return Err(());
            }
        }

        let Some(mut frame) = self.loops.pop() else {
            self.diags.log(self.line, "loop state is missing");
            self.branches.pop();
            return Err(());
        };

        frame.index += 1;
        if frame.index >= self.env.size_of(&frame.container) {
            // Exhausted: tear down every loop-scoped entry.
            self.env.erase(&frame.binding);
            if let Some(companion) = &frame.companion {
                self.env.erase(companion);
            }
            if frame.synthesized {
                self.env.erase(&frame.container);
            }
            self.branches.pop();
            return Ok(Flow::Next);
        }

        match &frame.companion {
            None => self.env.bind_element(&frame.container, &frame.binding, frame.index),
            Some(companion) => {
                self.env
                    .bind_entry(&frame.container, &frame.binding, companion, frame.index)
            }
        }

        // Replay the body: resume just after the `for` block without
        // re-running its header.
        let target = frame.resume + 1;
        self.loops.push(frame);
        Ok(Flow::Jump(target))
    }

    // ----- insert ------------------------------------------------------

    fn run_insert(&mut self, it: &mut TokenCursor, program: &mut Program) -> Fallible<Flow> {
        if !self.emitting() {
            it.skip_all();
            return Ok(Flow::Next);
        }

        it.next();
        if !it.matches(TokenKind::Str) {
            self.diags
                .log(self.line, "insert expects a quoted template name");
            return Err(());
        }
        let name = it.prev_text();

        let Some(loader) = self.loader else {
            self.diags
                .log(self.line, "no template loader configured for `insert`");
            return Ok(Flow::Next);
        };

        // Scan each path at most once per render; the recorded content hash
        // is enough to recognize a repeat.
        let (hash, scanned) = match self.hash_by_path.get(&name) {
            Some(&hash) => (hash, None),
            None => {
                let content = match loader.load(&name) {
                    Ok(content) => content,
                    Err(err) => {
                        self.diags
                            .log(self.line, format!("cannot read template `{name}`: {err}"));
                        return Ok(Flow::Next);
                    }
                };
                self.scan_count += 1;
                let sub = scan(&content, self.diags);
                let hash = sub.hash64();
                self.hash_by_path.insert(name.clone(), hash);
                (hash, Some(sub))
            }
        };

        let at = self.pc;
        if self.cache.contains_key(&hash) {
            return Ok(self.replay_cached(hash, at, program));
        }

        // First occurrence: splice the sub-program in place of this insert
        // block and replay from the start of the spliced range. A memoized
        // hash with no cache entry means the sub-template was empty; its
        // insert blocks are simply consumed.
        let Some(sub) = scanned else {
            program.remove(at);
            self.shift_cache(at, -1);
            return Ok(Flow::Jump(at));
        };
        let len = sub.len();
        if len == 0 {
            program.remove(at);
            self.shift_cache(at, -1);
            return Ok(Flow::Jump(at));
        }

        debug!(template = %name, at, blocks = len, "splicing inclusion");
        program.splice(at, sub.into_blocks());
        self.shift_cache(at, len as isize - 1);
        self.cache.insert(
            hash,
            CacheEntry {
                start: at,
                end: at + len,
                resume: 0,
                iterations: 1,
            },
        );
        Ok(Flow::Jump(at))
    }

    /// Repeat occurrence of a cached inclusion: collapse surrounding
    /// ranges and replay the cached range instead of re-splicing. The
    /// insert block stays in place so a cyclic inclusion keeps counting
    /// toward the cap; once the cap is exceeded the block is dead and is
    /// removed.
    fn replay_cached(&mut self, hash: u64, at: usize, program: &mut Program) -> Flow {
        // Enclosing ranges shrink back to the insert site; the cached block
        // stays represented by its single original occurrence.
        for (key, entry) in self.cache.iter_mut() {
            if *key != hash && entry.start <= at && at < entry.end {
                entry.end = at;
            }
        }

        let Some(entry) = self.cache.get_mut(&hash) else {
            return Flow::Next;
        };
        entry.iterations += 1;
        if entry.iterations > MAX_INCLUSIONS {
            self.diags.log(
                self.line,
                format!("inclusion replayed more than {MAX_INCLUSIONS} times, skipping"),
            );
            program.remove(at);
            self.shift_cache(at, -1);
            return Flow::Jump(at);
        }

        // Resume just past the original insert site once the replay runs
        // off the end of the cached range.
        entry.resume = at + 1;
        let start = entry.start;
        self.replaying = Some(hash);
        trace!(start, resume = at + 1, "replaying cached inclusion");
        Flow::Jump(start)
    }

    /// Renumber cache ranges after the block at `at` was replaced by
    /// `delta + 1` blocks. Indices strictly past the splice point shift;
    /// ranges containing it stretch or shrink so they keep covering the
    /// same blocks.
    fn shift_cache(&mut self, at: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        for entry in self.cache.values_mut() {
            if entry.start > at {
                entry.start = entry.start.wrapping_add_signed(delta);
            }
            if entry.end > at {
                entry.end = entry.end.wrapping_add_signed(delta);
            }
            if entry.resume > at {
                entry.resume = entry.resume.wrapping_add_signed(delta);
            }
        }
    }

    // ----- expressions -------------------------------------------------
    //
    // Recursive descent, one function per precedence tier, loosest first:
    // equality, logical, comparison, additive, multiplicative, unary,
    // primary. Operands and results live on the operand stack.

    fn parse_expression(&mut self, it: &mut TokenCursor) -> Fallible {
        self.parse_equality(it)
    }

    fn parse_equality(&mut self, it: &mut TokenCursor) -> Fallible {
        self.parse_logical(it)?;
        while it.matches(TokenKind::Eq) || it.matches(TokenKind::Ne) {
            let oper = it.prev().map(Token::kind).ok_or(())?;
            self.parse_logical(it)?;
            let value = self.compute(oper).ok_or(())?;
            self.stack.push(value);
        }
        Ok(())
    }

    fn parse_logical(&mut self, it: &mut TokenCursor) -> Fallible {
        self.parse_comparison(it)?;
        while it.matches(TokenKind::And) || it.matches(TokenKind::Or) {
            let oper = it.prev().map(Token::kind).ok_or(())?;
            self.parse_comparison(it)?;
            let value = self.compute(oper).ok_or(())?;
            self.stack.push(value);
        }
        Ok(())
    }

    fn parse_comparison(&mut self, it: &mut TokenCursor) -> Fallible {
        self.parse_addition(it)?;
        while it.matches(TokenKind::Gt)
            || it.matches(TokenKind::Ge)
            || it.matches(TokenKind::Lt)
            || it.matches(TokenKind::Le)
        {
            let oper = it.prev().map(Token::kind).ok_or(())?;
            self.parse_addition(it)?;
            let value = self.compute(oper).ok_or(())?;
            self.stack.push(value);
        }
        Ok(())
    }

    fn parse_addition(&mut self, it: &mut TokenCursor) -> Fallible {
        self.parse_multiplication(it)?;
        while it.matches(TokenKind::Plus) || it.matches(TokenKind::Minus) {
            let oper = it.prev().map(Token::kind).ok_or(())?;
            self.parse_multiplication(it)?;
            let value = self.compute(oper).ok_or(())?;
            self.stack.push(value);
        }
        Ok(())
    }

    fn parse_multiplication(&mut self, it: &mut TokenCursor) -> Fallible {
        self.parse_unary(it)?;
        while it.matches(TokenKind::Star)
            || it.matches(TokenKind::Slash)
            || it.matches(TokenKind::Percent)
        {
            let oper = it.prev().map(Token::kind).ok_or(())?;
            self.parse_unary(it)?;
            let value = self.compute(oper).ok_or(())?;
            self.stack.push(value);
        }
        Ok(())
    }

    fn parse_unary(&mut self, it: &mut TokenCursor) -> Fallible {
        if it.matches(TokenKind::Not) || it.matches(TokenKind::Minus) {
            let oper = it.prev().map(Token::kind).ok_or(())?;
            self.parse_unary(it)?;
            let value = self.compute_unary(oper).ok_or(())?;
            self.stack.push(value);
            return Ok(());
        }
        self.parse_primary(it)
    }

    fn parse_primary(&mut self, it: &mut TokenCursor) -> Fallible {
        if it.matches(TokenKind::Number) {
            let value: Number = it.prev_text().parse().unwrap_or(0);
            self.stack.push(Value::Number(value));
            return Ok(());
        }
        if it.matches(TokenKind::Str) {
            self.stack.push(Value::Str(it.prev_text()));
            return Ok(());
        }
        if it.matches(TokenKind::True) {
            self.stack.push(Value::Bool(true));
            return Ok(());
        }
        if it.matches(TokenKind::False) {
            self.stack.push(Value::Bool(false));
            return Ok(());
        }
        if it.matches(TokenKind::Identifier) {
            let id = it.prev_text();
            // An undefined name evaluates to nothing; downstream pops see
            // an empty stack and degrade to the null placeholder.
            if !self.env.contains(&id) {
                return Ok(());
            }
            if it.matches(TokenKind::LBracket) {
                return self.parse_index(it, id);
            }
            if let Some(value) = self.env.scalar(&id) {
                self.stack.push(value);
            }
            return Ok(());
        }
        if it.matches(TokenKind::LParen) {
            self.parse_expression(it)?;
            if !it.matches(TokenKind::RParen) {
                self.diags.log(self.line, "expected closing `)`");
                return Err(());
            }
            return Ok(());
        }

        self.diags.log(
            self.line,
            format!("unexpected token {:?} in expression", it.kind()),
        );
        Err(())
    }

    /// `identifier[expr]`: the index expression's runtime tag decides the
    /// lookup — string keys address maps, numbers address list positions.
    fn parse_index(&mut self, it: &mut TokenCursor, id: String) -> Fallible {
        self.stack.push(Value::Str(id));
        self.parse_primary(it)?;

        match self.stack.top() {
            Some(Value::Str(_)) => {
                let key = self.stack.pop_string_or("");
                let id = self.stack.pop_string_or("");
                match self.env.entry(&id, &key) {
                    Some(value) => self.stack.push(value),
                    None => self
                        .diags
                        .log(self.line, format!("key `{key}` not found in `{id}`")),
                }
            }
            Some(Value::Number(_)) => {
                let index = self.stack.pop_number_or(0) as usize;
                let id = self.stack.pop_string_or("");
                match self.env.element(&id, index) {
                    Some(value) => self.stack.push(value),
                    None => self
                        .diags
                        .log(self.line, format!("index {index} is out of range in `{id}`")),
                }
            }
            _ => {
                self.stack.pop();
                self.stack.push(Value::Str("<null>".to_string()));
            }
        }

        if !it.matches(TokenKind::RBracket) {
            self.diags.log(self.line, "expected closing `]`");
            return Err(());
        }
        Ok(())
    }

    // ----- operator dispatch -------------------------------------------

    fn compute(&mut self, oper: TokenKind) -> Option<Value> {
        let b = self.stack.pop()?;
        let a = self.stack.pop()?;

        match (&a, &b) {
            (Value::Number(a), Value::Number(b)) => self.compute_numbers(*a, *b, oper),
            (Value::Str(a), Value::Str(b)) => compute_strings(a, b, oper),
            (Value::Bool(a), Value::Bool(b)) => match oper {
                TokenKind::Eq => Some(Value::Bool(a == b)),
                TokenKind::Ne => Some(Value::Bool(a != b)),
                TokenKind::And => Some(Value::Bool(*a && *b)),
                TokenKind::Or => Some(Value::Bool(*a || *b)),
                _ => None,
            },
            _ => {
                self.diags.log(
                    self.line,
                    format!(
                        "mismatched types, {} `{}` cannot compute with {} `{}`",
                        a.tag(),
                        a.render(),
                        b.tag(),
                        b.render()
                    ),
                );
                None
            }
        }
    }

    fn compute_numbers(&mut self, a: Number, b: Number, oper: TokenKind) -> Option<Value> {
        match oper {
            TokenKind::Plus => Some(Value::Number(a.wrapping_add(b))),
            TokenKind::Minus => Some(Value::Number(a.wrapping_sub(b))),
            TokenKind::Star => Some(Value::Number(a.wrapping_mul(b))),
            TokenKind::Slash | TokenKind::Percent => {
                if b == 0 {
                    self.diags.log(self.line, "cannot divide by 0");
                    return None;
                }
                if oper == TokenKind::Slash {
                    Some(Value::Number(a / b))
                } else {
                    Some(Value::Number(a % b))
                }
            }
            TokenKind::Eq => Some(Value::Bool(a == b)),
            TokenKind::Ne => Some(Value::Bool(a != b)),
            TokenKind::Gt => Some(Value::Bool(a > b)),
            TokenKind::Ge => Some(Value::Bool(a >= b)),
            TokenKind::Lt => Some(Value::Bool(a < b)),
            TokenKind::Le => Some(Value::Bool(a <= b)),
            _ => None,
        }
    }

    fn compute_unary(&mut self, oper: TokenKind) -> Option<Value> {
        let value = self.stack.pop()?;
        match (oper, &value) {
            (TokenKind::Minus, Value::Number(n)) => Some(Value::Number(n.wrapping_neg())),
            (TokenKind::Not, Value::Number(n)) => Some(Value::Bool(*n == 0)),
            (TokenKind::Not, Value::Str(s)) => Some(Value::Bool(s.is_empty())),
            (TokenKind::Not, Value::Bool(b)) => Some(Value::Bool(!b)),
            _ => {
                self.diags.log(
                    self.line,
                    format!(
                        "unary operator cannot be applied to {} `{}`",
                        value.tag(),
                        value.render()
                    ),
                );
                None
            }
        }
    }
}

fn compute_strings(a: &str, b: &str, oper: TokenKind) -> Option<Value> {
    match oper {
        TokenKind::Plus => Some(Value::Str(format!("{a}{b}"))),
        TokenKind::Eq => Some(Value::Bool(a == b)),
        TokenKind::Ne => Some(Value::Bool(a != b)),
        TokenKind::Gt => Some(Value::Bool(a > b)),
        TokenKind::Ge => Some(Value::Bool(a >= b)),
        TokenKind::Lt => Some(Value::Bool(a < b)),
        TokenKind::Le => Some(Value::Bool(a <= b)),
        _ => None,
    }
}
