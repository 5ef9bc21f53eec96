/// Logical keys shared between frontends and machines.
///
/// Frontends map their native keycodes onto this set; machines map it
/// onto whatever inputs the emulated hardware has.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Key {
    None,
    Num1,
    Num2,
    A,
    C,
    D,
    P,
    S,
    Space,
    Left,
    Right,
}
