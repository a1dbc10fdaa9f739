use bitflags::bitflags;

bitflags! {
    /// Flags byte of the authenticator data.
    ///
    /// Bits without a name (1, 5) are reserved for future use. They are retained when decoding so
    /// the signed bytes can be reproduced, but carry no meaning for the ceremony checks.
    ///
    /// <https://w3c.github.io/webauthn/#authdata-flags>
    #[repr(transparent)]
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    pub struct Flags: u8 {
        /// User Present, bit 0
        const UP = 1 << 0;
        /// User Verified, bit 2
        const UV = 1 << 2;
        /// Backup Eligibility, bit 3
        const BE = 1 << 3;
        /// Backup State, bit 4
        const BS = 1 << 4;
        /// Attested Credential Data included, bit 6
        const AT = 1 << 6;
        /// Extension Data included, bit 7
        const ED = 1 << 7;
    }
}

impl Flags {
    /// The authenticator reports that the user was present.
    pub fn user_present(&self) -> bool {
        self.contains(Flags::UP)
    }

    /// The authenticator reports that the user was verified.
    pub fn user_verified(&self) -> bool {
        self.contains(Flags::UV)
    }

    /// The credential may be backed up and synced to other devices.
    pub fn backup_eligible(&self) -> bool {
        self.contains(Flags::BE)
    }

    /// The credential is currently backed up.
    pub fn backed_up(&self) -> bool {
        self.contains(Flags::BS)
    }
}

impl From<Flags> for u8 {
    fn from(src: Flags) -> Self {
        src.bits()
    }
}

impl From<u8> for Flags {
    fn from(value: u8) -> Self {
        Flags::from_bits_retain(value)
    }
}
