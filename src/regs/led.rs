use bitflags::bitflags;

bitflags! {
    /// Front panel capture indicators.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Indicators: u8 {
        const Armed     = 1<<0;
        const Triggered = 1<<1;
    }
}

impl Default for Indicators {
    fn default() -> Self {
        Indicators::empty()
    }
}
