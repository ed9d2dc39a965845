//! ELF64 on-disk record layouts, read directly out of the image via
//! `zerocopy` rather than hand-rolled byte-by-byte parsing — the same shape
//! the teacher uses for its own on-disk/on-wire records (`App`, `TaskDesc`,
//! `RegionDesc` in `abi::lib`), just applied to the ELF64 spec's records
//! instead of a bespoke application format.

use zerocopy::{AsBytes, FromBytes, Unaligned};

pub const SHT_NULL: u32 = 0;
pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_RELA: u32 = 4;
pub const SHT_NOBITS: u32 = 8;
pub const SHT_REL: u32 = 9;
pub const SHT_DYNSYM: u32 = 11;

pub const SHN_UNDEF: u16 = 0;
pub const SHN_ABS: u16 = 0xfff1;
pub const SHN_COMMON: u16 = 0xfff2;

/// `R_X86_64_NONE`: no relocation.
pub const R_X86_64_NONE: u32 = 0;
/// `R_X86_64_64`: `S + A`, full 64-bit width.
pub const R_X86_64_64: u32 = 1;
/// `R_X86_64_PC32`: `S + A - P`, truncated to 32 bits.
pub const R_X86_64_PC32: u32 = 2;
/// `R_X86_64_PLT32`: treated identically to `PC32` for a statically linked,
/// already-resolved image (no actual PLT indirection at load time).
pub const R_X86_64_PLT32: u32 = 4;
/// `R_X86_64_32`: `S + A`, truncated to 32 bits, zero-extended semantics.
pub const R_X86_64_32: u32 = 10;
/// `R_X86_64_32S`: `S + A`, truncated to 32 bits, sign-extended semantics.
pub const R_X86_64_32S: u32 = 11;
/// `R_X86_64_16`: `S + A`, truncated to 16 bits.
pub const R_X86_64_16: u32 = 12;
/// `R_X86_64_PC16`: `S + A - P`, truncated to 16 bits.
pub const R_X86_64_PC16: u32 = 13;

pub fn elf64_r_sym(info: u64) -> u32 {
    (info >> 32) as u32
}

pub fn elf64_r_type(info: u64) -> u32 {
    (info & 0xffff_ffff) as u32
}

pub fn elf64_r_info(sym: u32, ty: u32) -> u64 {
    ((sym as u64) << 32) | (ty as u64)
}

#[derive(FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct Elf64Ehdr {
    pub e_ident: [u8; 16],
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u64,
    pub e_phoff: u64,
    pub e_shoff: u64,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

#[derive(FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct Elf64Shdr {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u64,
    pub sh_entsize: u64,
}

#[derive(FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct Elf64Sym {
    pub st_name: u32,
    pub st_info: u8,
    pub st_other: u8,
    pub st_shndx: u16,
    pub st_value: u64,
    pub st_size: u64,
}

#[derive(FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct Elf64Rel {
    pub r_offset: u64,
    pub r_info: u64,
}

#[derive(FromBytes, AsBytes, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct Elf64Rela {
    pub r_offset: u64,
    pub r_info: u64,
    pub r_addend: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn r_info_packing_roundtrips() {
        let info = elf64_r_info(0x1234, R_X86_64_PC32);
        assert_eq!(elf64_r_sym(info), 0x1234);
        assert_eq!(elf64_r_type(info), R_X86_64_PC32);
    }
}
