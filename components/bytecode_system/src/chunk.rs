//! Bytecode chunk - compiled code container
//!
//! Contains instructions, the constant pool and a run-length encoded line
//! table mapping instruction offsets back to source positions.

use crate::opcode::OpCode;
use core_types::{SourcePosition, Value};

/// Largest constant pool a chunk can address
pub const MAX_CONSTANTS: usize = u16::MAX as usize + 1;

/// Start of a run of instructions that share one source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStart {
    /// Offset of the first instruction in the run
    pub offset: usize,
    /// Source line of every instruction in the run
    pub line: u32,
    /// Source column of every instruction in the run
    pub column: u32,
}

/// A compiled function body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chunk {
    /// Instruction stream
    pub code: Vec<OpCode>,
    /// Constant pool
    pub constants: Vec<Value>,
    /// Run-length position table, sorted by offset
    lines: Vec<LineStart>,
}

impl Chunk {
    /// Create a new empty chunk
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction and return its offset.
    ///
    /// A new line-table run starts only when the position differs from the
    /// previous instruction's.
    pub fn write(&mut self, op: OpCode, position: SourcePosition) -> usize {
        let offset = self.code.len();
        self.code.push(op);

        let continues_run = self
            .lines
            .last()
            .is_some_and(|run| run.line == position.line && run.column == position.column);
        if !continues_run {
            self.lines.push(LineStart {
                offset,
                line: position.line,
                column: position.column,
            });
        }
        offset
    }

    /// Add a constant to the pool and return its index
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Replace the distance of the forward jump at `offset`
    pub fn patch_jump(&mut self, offset: usize, distance: u16) {
        if let Some(op) = self.code.get_mut(offset) {
            *op = op.with_jump_distance(distance);
        }
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Returns true if the chunk has no instructions
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// The line-table runs
    pub fn lines(&self) -> &[LineStart] {
        &self.lines
    }

    /// Binary search for the run covering `offset`
    fn run_for(&self, offset: usize) -> Option<&LineStart> {
        let idx = self.lines.partition_point(|run| run.offset <= offset);
        if idx == 0 {
            None
        } else {
            self.lines.get(idx - 1)
        }
    }

    /// Source line of the instruction at `offset`, 0 if unknown
    pub fn get_line(&self, offset: usize) -> u32 {
        self.run_for(offset).map_or(0, |run| run.line)
    }

    /// Source column of the instruction at `offset`, 0 if unknown
    pub fn get_column(&self, offset: usize) -> u32 {
        self.run_for(offset).map_or(0, |run| run.column)
    }

    /// Line and column of the instruction at `offset`
    pub fn position(&self, offset: usize) -> SourcePosition {
        match self.run_for(offset) {
            Some(run) => SourcePosition::new(run.line, run.column),
            None => SourcePosition::default(),
        }
    }
}
