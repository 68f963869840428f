use super::Word;

/// Size, in words, of each of the three memory banks.
pub const MEM_SIZE: usize = 4096;

/// `LoadG`/`StoG` target selectors for the memory-mapped control registers.
pub const CTRL_PC: Word = 0;
pub const CTRL_TOP: Word = 1;
pub const CTRL_BP: Word = 2;

/// First user-visible global data address; `D[a - DATA_BASE]` for `a >= DATA_BASE`.
pub const DATA_BASE: Word = 3;

/// Frame layout, offsets relative to `BP`: return address, lexical-level
/// delta, static link, dynamic link, then locals.
pub const FRAME_RETURN_ADDR: usize = 0;
pub const FRAME_LLD: usize = 1;
pub const FRAME_STATIC_LINK: usize = 2;
pub const FRAME_DYNAMIC_LINK: usize = 3;
pub const FRAME_LOCALS: usize = 4;
