//! Email-to-SMS gateway addressing.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// US carriers with a public email-to-SMS gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Carrier {
    Verizon,
    Att,
    TMobile,
    Sprint,
    UsCellular,
    Boost,
    Cricket,
}

impl Carrier {
    pub const ALL: [Carrier; 7] = [
        Carrier::Verizon,
        Carrier::Att,
        Carrier::TMobile,
        Carrier::Sprint,
        Carrier::UsCellular,
        Carrier::Boost,
        Carrier::Cricket,
    ];

    /// Gateway domain appended after the phone digits.
    pub fn gateway_domain(self) -> &'static str {
        match self {
            Carrier::Verizon => "vtext.com",
            Carrier::Att => "txt.att.net",
            Carrier::TMobile => "tmomail.net",
            Carrier::Sprint => "messaging.sprintpcs.com",
            Carrier::UsCellular => "email.uscc.net",
            Carrier::Boost => "sms.myboostmobile.com",
            Carrier::Cricket => "sms.cricketwireless.net",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Carrier::Verizon => "verizon",
            Carrier::Att => "att",
            Carrier::TMobile => "t-mobile",
            Carrier::Sprint => "sprint",
            Carrier::UsCellular => "us-cellular",
            Carrier::Boost => "boost",
            Carrier::Cricket => "cricket",
        }
    }
}

impl FromStr for Carrier {
    type Err = ValidationError;

    /// Case-insensitive; ignores spaces, dashes, underscores and `&`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let carrier = match key.as_str() {
            "verizon" => Carrier::Verizon,
            "att" => Carrier::Att,
            "tmobile" => Carrier::TMobile,
            "sprint" => Carrier::Sprint,
            "uscellular" => Carrier::UsCellular,
            "boost" | "boostmobile" => Carrier::Boost,
            "cricket" => Carrier::Cricket,
            _ => return Err(ValidationError::UnknownCarrier(s.to_string())),
        };
        Ok(carrier)
    }
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `digits@gateway` for a US phone number.
///
/// Non-digits are dropped; 10 digits, or 11 with a leading country code 1,
/// are accepted.
pub fn sms_gateway_address(phone: &str, carrier: Carrier) -> Result<String, ValidationError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let local = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('1') => &digits[1..],
        _ => {
            return Err(ValidationError::InvalidValue {
                field: "phone".into(),
                message: format!("expected a 10-digit number, got '{phone}'"),
            })
        }
    };
    Ok(format!("{local}@{}", carrier.gateway_domain()))
}
