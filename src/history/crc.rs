/// CRC-16/CCITT (polynomial 0x1021, initial value 0xFFFF) as used to
/// protect history pages.
pub struct Crc16 {
    state: u16,
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc16 {
    const POLY: u16 = 0x1021;

    pub fn new() -> Self {
        Self { state: 0xFFFF }
    }

    pub fn from_iter(data: impl Iterator<Item = u8>) -> u16 {
        let mut me = Self::default();

        data.for_each(|v| me.feed(v));

        me.finalize()
    }

    pub fn feed(&mut self, data: u8) {
        self.state ^= u16::from(data) << 8;

        for _ in 0..8 {
            self.state = if self.state & 0x8000 != 0 {
                (self.state << 1) ^ Self::POLY
            } else {
                self.state << 1
            };
        }
    }

    pub fn finalize(&self) -> u16 {
        self.state
    }
}

#[test]
pub fn crc_check_value() {
    let output = Crc16::from_iter(b"123456789".iter().copied());

    assert_eq!(0x29B1, output);
}
