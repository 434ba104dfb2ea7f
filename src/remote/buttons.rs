use serde::Serialize;

/// Physical section of the remote a key belongs to; each one is toggled by
/// its own `show_*` option.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyGroup {
    Dpad,
    Nav,
    Mid,
    Media,
    Colors,
    Abc,
}

/// Remote keys and their backend command ids
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Ok,
    Back,
    Home,
    Menu,
    VolUp,
    VolDown,
    Mute,
    ChUp,
    ChDown,
    Guide,
    Rew,
    Play,
    Fwd,
    Dvr,
    Pause,
    Exit,
    Red,
    Green,
    Yellow,
    Blue,
    A,
    B,
    C,
}

impl Key {
    /// Layout order
    pub const ALL: [Key; 27] = [
        Key::Up,
        Key::Down,
        Key::Left,
        Key::Right,
        Key::Ok,
        Key::Back,
        Key::Home,
        Key::Menu,
        Key::VolUp,
        Key::VolDown,
        Key::Guide,
        Key::Mute,
        Key::ChUp,
        Key::ChDown,
        Key::Rew,
        Key::Play,
        Key::Fwd,
        Key::Dvr,
        Key::Pause,
        Key::Exit,
        Key::Red,
        Key::Green,
        Key::Yellow,
        Key::Blue,
        Key::A,
        Key::B,
        Key::C,
    ];

    pub fn id(self) -> i64 {
        match self {
            Key::Up => 174,
            Key::Down => 178,
            Key::Left => 175,
            Key::Right => 177,
            Key::Ok => 176,
            Key::Back => 179,
            Key::Home => 180,
            Key::Menu => 181,
            Key::VolUp => 182,
            Key::VolDown => 185,
            Key::Mute => 184,
            Key::ChUp => 183,
            Key::ChDown => 186,
            Key::Guide => 157,
            Key::Dvr => 155,
            Key::Play => 156,
            Key::Exit => 154,
            Key::A => 153,
            Key::B => 152,
            Key::C => 151,
            Key::Rew => 187,
            Key::Pause => 188,
            Key::Fwd => 189,
            Key::Red => 190,
            Key::Green => 191,
            Key::Yellow => 192,
            Key::Blue => 193,
        }
    }

    pub fn from_id(id: i64) -> Option<Key> {
        Key::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            Key::Up => "up",
            Key::Down => "down",
            Key::Left => "left",
            Key::Right => "right",
            Key::Ok => "ok",
            Key::Back => "back",
            Key::Home => "home",
            Key::Menu => "menu",
            Key::VolUp => "vol_up",
            Key::VolDown => "vol_down",
            Key::Mute => "mute",
            Key::ChUp => "ch_up",
            Key::ChDown => "ch_down",
            Key::Guide => "guide",
            Key::Rew => "rew",
            Key::Play => "play",
            Key::Fwd => "fwd",
            Key::Dvr => "dvr",
            Key::Pause => "pause",
            Key::Exit => "exit",
            Key::Red => "red",
            Key::Green => "green",
            Key::Yellow => "yellow",
            Key::Blue => "blue",
            Key::A => "a",
            Key::B => "b",
            Key::C => "c",
        }
    }

    /// Look a key up by name (case-insensitive) or numeric id
    pub fn parse(input: &str) -> Option<Key> {
        let input = input.trim();
        if let Ok(id) = input.parse::<i64>() {
            return Key::from_id(id);
        }
        let lower = input.to_lowercase();
        Key::ALL.into_iter().find(|k| k.name() == lower)
    }

    pub fn group(self) -> KeyGroup {
        match self {
            Key::Up | Key::Down | Key::Left | Key::Right | Key::Ok => KeyGroup::Dpad,
            Key::Back | Key::Home | Key::Menu => KeyGroup::Nav,
            Key::VolUp | Key::VolDown | Key::Guide | Key::Mute | Key::ChUp | Key::ChDown => {
                KeyGroup::Mid
            }
            Key::Rew | Key::Play | Key::Fwd | Key::Dvr | Key::Pause | Key::Exit => KeyGroup::Media,
            Key::Red | Key::Green | Key::Yellow | Key::Blue => KeyGroup::Colors,
            Key::A | Key::B | Key::C => KeyGroup::Abc,
        }
    }

    /// Keys that only exist on X2 hardware
    pub fn is_x2_only(self) -> bool {
        matches!(
            self,
            Key::C | Key::B | Key::A | Key::Exit | Key::Dvr | Key::Play | Key::Guide
        )
    }
}
