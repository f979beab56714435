#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TzKey {
    Up,
    Down,
    Left,
    Right,
    Confirm,
}

/// Events the surrounding UI feeds into the network task, one queue drain per
/// frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UiEvent {
    StartSync,
    Resync,
    Cancel,
    Exit,
    Timezone(TzKey),
}
