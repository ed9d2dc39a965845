//! Loader error reporting.
//!
//! The original accumulates failures into a bitmask so a caller can see
//! everything wrong with an image in one pass rather than stopping at the
//! first fault; `bitflags` gives the same shape a `match`-able name instead
//! of raw shifted constants.

use bitflags::bitflags;

bitflags! {
    /// Individual fault bits, named after what's actually wrong, plus one
    /// umbrella bit per pipeline stage so a caller can cheaply ask "did
    /// this stage fail at all" without enumerating every specific bit.
    pub struct LoaderFault: u32 {
        /// A section the loader needs to assign address space for has
        /// `SHT_NOBITS` type but isn't `.bss` (no data to not-load).
        const NOBITS_SECTION      = 1 << 0;
        /// A symbol table section's linked string-table index is out of
        /// range or doesn't point at a string table.
        const SYMTBL_BAD_STRTBL   = 1 << 1;
        /// A relocation section's target-section index is invalid.
        const RTBL_INV_STID       = 1 << 2;
        /// A relocation section's linked symbol-table index is invalid.
        const RTBL_INV_RSID       = 1 << 3;
        /// A relocation entry's symbol index is the null symbol (index 0),
        /// which carries no address.
        const RSYM_NULL_INDEX     = 1 << 4;
        /// A relocation entry's symbol index is out of range for the
        /// linked symbol table.
        const RSYM_INV_INDEX      = 1 << 5;
        /// A relocation's resolved symbol has no address (undefined, and
        /// not satisfied by a caller-provided extern definition).
        const RSYM_NULL_ADDR      = 1 << 6;
        /// A relocation entry names a type this loader doesn't implement.
        const RTYPE_UNSUPPORTED   = 1 << 7;
        /// A relocation's computed value doesn't fit the field width it's
        /// being written into.
        const RVAL_OVERFLOW       = 1 << 8;
        /// A stage was invoked twice against the same environment.
        const REDETECTION         = 1 << 9;
        /// An operation was attempted against the wrong pipeline stage.
        const INV_FSTATUS         = 1 << 10;

        const SECT_ASSIGN_FAILED  = 1 << 12;
        const SYMB_ASSIGN_FAILED  = 1 << 13;
        const RELOC_APPL_FAILED   = 1 << 14;
    }
}

/// A loader-pipeline error. Most stages just report their fault bitmask;
/// `assign_symbols` additionally names which symbol-table section was
/// responsible, the one piece of richer diagnostic information the loader
/// promises beyond a bare bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderError {
    Sections(LoaderFault),
    Symbols {
        faults: LoaderFault,
        /// Index of the offending `SHT_SYMTAB`/`SHT_DYNSYM` section, if the
        /// fault can be pinned to one specific table.
        symtab_section: Option<u16>,
    },
    Relocations(LoaderFault),
    WrongStage,
}

impl abi::IntoCode for LoaderError {
    fn into_code(self) -> abi::Code {
        match self {
            LoaderError::Sections(f) => f.bits() as abi::Code,
            LoaderError::Symbols { faults, .. } => faults.bits() as abi::Code,
            LoaderError::Relocations(f) => f.bits() as abi::Code,
            LoaderError::WrongStage => LoaderFault::INV_FSTATUS.bits() as abi::Code,
        }
    }
}
