//! PCI Express enhanced configuration mechanism (ECAM) addressing.
//!
//! Config space for bus/slot/function lives at a fixed physical window;
//! see the layout at <http://wiki.osdev.org/PCI_Express>.

/// Base physical address of the ECAM window.
pub const ECAM_BASE: u32 = 0xe000_0000;

/// Bytes of configuration space per function.
pub const CONFIG_SPACE_LEN: usize = 256;

/// Physical address of a configuration register.
///
/// Field widths: bus 8 bits, slot 5, function 3, register 12 with the
/// bottom two bits forced clear (dword-aligned access).
pub fn ecam_address(bus: u32, slot: u32, func: u32, reg: u32) -> u32 {
    ECAM_BASE | ((bus & 0xff) << 20) | ((slot & 0x1f) << 15) | ((func & 0x07) << 12) | (reg & 0xffc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_function_maps_to_the_window_base() {
        assert_eq!(ecam_address(0, 0, 0, 0), 0xe000_0000);
    }

    #[test]
    fn fields_land_in_their_bit_ranges() {
        assert_eq!(ecam_address(1, 0, 0, 0), 0xe010_0000);
        assert_eq!(ecam_address(0, 1, 0, 0), 0xe000_8000);
        assert_eq!(ecam_address(0, 0, 1, 0), 0xe000_1000);
        assert_eq!(ecam_address(0, 0, 0, 0x40), 0xe000_0040);
        assert_eq!(ecam_address(2, 3, 1, 0x10), 0xe021_9010);
    }

    #[test]
    fn register_low_bits_are_cleared() {
        assert_eq!(ecam_address(0, 0, 0, 0x43), 0xe000_0040);
    }

    #[test]
    fn out_of_range_fields_are_masked() {
        assert_eq!(ecam_address(0x1ff, 0, 0, 0), ecam_address(0xff, 0, 0, 0));
        assert_eq!(ecam_address(0, 0x3f, 0, 0), ecam_address(0, 0x1f, 0, 0));
        assert_eq!(ecam_address(0, 0, 0x0f, 0), ecam_address(0, 0, 0x07, 0));
    }
}
