use std::fmt;
use std::str::FromStr;

/// Raised when a string does not name a member of one of the closed
/// vocabularies below.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind} '{value}'. Only {allowed} are permitted.")]
pub struct InvalidSetting {
    pub kind: &'static str,
    pub value: String,
    pub allowed: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    C1,
    C2,
    External,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::C1 => "C1",
            Channel::C2 => "C2",
            Channel::External => "EX",
        }
    }

    /// Analog input channels only; the external trigger input carries no trace.
    pub fn is_analog(&self) -> bool {
        matches!(self, Channel::C1 | Channel::C2)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for Channel {
    type Error = InvalidSetting;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Channel::C1),
            2 => Ok(Channel::C2),
            _ => Err(InvalidSetting {
                kind: "channel",
                value: n.to_string(),
                allowed: "1, 2 or 'EX'",
            }),
        }
    }
}

macro_rules! setting_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal, $allowed:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InvalidSetting;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(InvalidSetting {
                        kind: $kind,
                        value: s.to_string(),
                        allowed: $allowed,
                    }),
                }
            }
        }
    };
}

setting_enum! {
    /// Input coupling. Always sent with the 1 MOhm termination.
    Coupling, "coupling", "'AC' or 'DC'" {
        Ac => "AC",
        Dc => "DC",
    }
}

impl Coupling {
    pub(crate) fn command_value(self) -> &'static str {
        match self {
            Coupling::Ac => "A1M",
            Coupling::Dc => "D1M",
        }
    }
}

setting_enum! {
    VoltUnit, "units", "'V', 'mV', or 'uV'" {
        V => "V",
        MilliV => "mV",
        MicroV => "uV",
    }
}

setting_enum! {
    TimeUnit, "units", "'ns', 'us', 'ms' and 's'" {
        Ns => "NS",
        Us => "US",
        Ms => "MS",
        S => "S",
    }
}

impl TimeUnit {
    /// Case-insensitive variant of `from_str`, accepting `ms` as well as `MS`.
    pub fn parse_any_case(s: &str) -> Result<Self, InvalidSetting> {
        s.to_ascii_uppercase().parse()
    }
}

setting_enum! {
    TriggerCoupling, "coupling option", "'AC', 'DC', 'HFREJ', and 'LFREJ'" {
        Ac => "AC",
        Dc => "DC",
        HfReject => "HFREJ",
        LfReject => "LFREJ",
    }
}

setting_enum! {
    TriggerMode, "mode", "'AUTO', 'NORM', and 'SINGLE'" {
        Auto => "AUTO",
        Normal => "NORM",
        Single => "SINGLE",
    }
}

setting_enum! {
    TriggerSlope, "slope option", "'NEG', 'POS', or 'WINDOW'" {
        Negative => "NEG",
        Positive => "POS",
        Window => "WINDOW",
    }
}

impl FromStr for Channel {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" | "C1" => Ok(Channel::C1),
            "2" | "C2" => Ok(Channel::C2),
            "EX" => Ok(Channel::External),
            _ => Err(InvalidSetting {
                kind: "channel",
                value: s.to_string(),
                allowed: "1, 2 or 'EX'",
            }),
        }
    }
}

/// The time/div steps the front panel offers within each decade.
pub const TIME_DIV_STEPS: [f64; 9] = [1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0];

pub fn is_time_div_step(value: f64) -> bool {
    TIME_DIV_STEPS.iter().any(|step| (step - value).abs() < f64::EPSILON)
}
