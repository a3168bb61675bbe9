use crate::parser::ast::Type;

/// Bytes reserved below the saved RBP for the two expression spill slots,
/// at -8(%rbp) and -16(%rbp). Locals start below them.
pub const TEMP_SLOTS: i64 = 16;

#[derive(Debug, Clone)]
pub struct StackVar {
    pub name: String,
    pub ty: Type,
    /// Negative displacement from %rbp.
    pub offset: i64,
}

/// Restore point taken at block entry. Restoring truncates the variable
/// list and rewinds the allocation depth, so inner declarations stop
/// resolving and their slots are reused by later blocks.
#[derive(Debug, Clone, Copy)]
pub struct FrameMark {
    vars_len: usize,
    depth: i64,
}

/// Per-function stack frame. Tracks live locals in declaration order and
/// the deepest point the frame ever reached; the prologue claims that
/// high-water size once the body has been fully generated.
#[derive(Debug)]
pub struct Frame {
    vars: Vec<StackVar>,
    depth: i64,
    high_water: i64,
}

impl Frame {
    pub fn new() -> Self {
        Frame {
            vars: Vec::new(),
            depth: TEMP_SLOTS,
            high_water: TEMP_SLOTS,
        }
    }

    /// Allocates a scalar slot. All scalars occupy a uniform 8-byte slot.
    /// Returns the negative RBP displacement.
    pub fn alloc(&mut self, name: &str, ty: Type) -> i64 {
        self.alloc_sized(name, ty, 8)
    }

    /// Allocates a struct-sized region. `size` must already be rounded up
    /// to 8 by the struct layout rule. Field `f` of the struct lives at
    /// `offset + f` (field offsets grow toward the frame base).
    pub fn alloc_struct(&mut self, name: &str, struct_name: &str, size: i64) -> i64 {
        self.alloc_sized(name, Type::Struct(struct_name.to_string()), size)
    }

    fn alloc_sized(&mut self, name: &str, ty: Type, size: i64) -> i64 {
        self.depth += size;
        if self.depth > self.high_water {
            self.high_water = self.depth;
        }
        let offset = -self.depth;
        self.vars.push(StackVar {
            name: name.to_string(),
            ty,
            offset,
        });
        offset
    }

    /// Most-recent-first lookup, so inner declarations shadow outer ones.
    pub fn lookup(&self, name: &str) -> Option<&StackVar> {
        self.vars.iter().rev().find(|v| v.name == name)
    }

    pub fn mark(&self) -> FrameMark {
        FrameMark {
            vars_len: self.vars.len(),
            depth: self.depth,
        }
    }

    pub fn release(&mut self, mark: FrameMark) {
        self.vars.truncate(mark.vars_len);
        self.depth = mark.depth;
    }

    /// Final frame size for the prologue `subq`, rounded up to 16 so RSP
    /// stays 16-byte aligned at every call.
    pub fn frame_size(&self) -> i64 {
        (self.high_water + 15) & !15
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_start_below_temp_slots() {
        let mut frame = Frame::new();
        assert_eq!(frame.alloc("x", Type::Int), -24);
        assert_eq!(frame.alloc("y", Type::Float), -32);
        assert_eq!(frame.frame_size(), 32);
    }

    #[test]
    fn test_shadowing_resolves_innermost() {
        let mut frame = Frame::new();
        frame.alloc("x", Type::Int);
        let inner = frame.alloc("x", Type::Bool);
        let var = frame.lookup("x").unwrap();
        assert_eq!(var.offset, inner);
        assert_eq!(var.ty, Type::Bool);
    }

    #[test]
    fn test_block_release_rewinds_depth_but_not_high_water() {
        let mut frame = Frame::new();
        frame.alloc("a", Type::Int);
        let mark = frame.mark();
        frame.alloc("b", Type::Int);
        frame.alloc("c", Type::Int);
        frame.release(mark);
        assert!(frame.lookup("b").is_none());
        assert_eq!(frame.alloc("d", Type::Int), -32);
        assert_eq!(frame.frame_size(), 48);
    }

    #[test]
    fn test_struct_allocation_claims_whole_region() {
        let mut frame = Frame::new();
        let base = frame.alloc_struct("p", "Point", 16);
        assert_eq!(base, -32);
        assert_eq!(frame.alloc("x", Type::Int), -40);
    }
}
