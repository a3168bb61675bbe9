/// General purpose registers named by their 64-bit form. Width-specific
/// spellings come from the accessor methods so instruction emission never
/// pastes register strings together by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    R8,
    R9,
    R10,
    R11,
}

impl Reg {
    /// 64-bit name, e.g. `%rax`.
    pub fn q(self) -> &'static str {
        match self {
            Reg::Rax => "%rax",
            Reg::Rbx => "%rbx",
            Reg::Rcx => "%rcx",
            Reg::Rdx => "%rdx",
            Reg::Rsi => "%rsi",
            Reg::Rdi => "%rdi",
            Reg::R8 => "%r8",
            Reg::R9 => "%r9",
            Reg::R10 => "%r10",
            Reg::R11 => "%r11",
        }
    }

    /// 32-bit name, e.g. `%eax`.
    pub fn l(self) -> &'static str {
        match self {
            Reg::Rax => "%eax",
            Reg::Rbx => "%ebx",
            Reg::Rcx => "%ecx",
            Reg::Rdx => "%edx",
            Reg::Rsi => "%esi",
            Reg::Rdi => "%edi",
            Reg::R8 => "%r8d",
            Reg::R9 => "%r9d",
            Reg::R10 => "%r10d",
            Reg::R11 => "%r11d",
        }
    }

    /// Low byte name, e.g. `%al`.
    pub fn b(self) -> &'static str {
        match self {
            Reg::Rax => "%al",
            Reg::Rbx => "%bl",
            Reg::Rcx => "%cl",
            Reg::Rdx => "%dl",
            Reg::Rsi => "%sil",
            Reg::Rdi => "%dil",
            Reg::R8 => "%r8b",
            Reg::R9 => "%r9b",
            Reg::R10 => "%r10b",
            Reg::R11 => "%r11b",
        }
    }
}

/// SSE registers used for float values and float argument passing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Xmm {
    Xmm0,
    Xmm1,
    Xmm2,
    Xmm3,
    Xmm4,
    Xmm5,
}

impl Xmm {
    pub fn name(self) -> &'static str {
        match self {
            Xmm::Xmm0 => "%xmm0",
            Xmm::Xmm1 => "%xmm1",
            Xmm::Xmm2 => "%xmm2",
            Xmm::Xmm3 => "%xmm3",
            Xmm::Xmm4 => "%xmm4",
            Xmm::Xmm5 => "%xmm5",
        }
    }
}

/// Integer argument registers in System V order.
pub const ARG_GPR: [Reg; 6] = [Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9];

/// Float argument registers in System V order.
pub const ARG_SSE: [Xmm; 6] = [Xmm::Xmm0, Xmm::Xmm1, Xmm::Xmm2, Xmm::Xmm3, Xmm::Xmm4, Xmm::Xmm5];
