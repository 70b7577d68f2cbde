//! Dialogue acts: the semantic input a generated tree has to express.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusError;

/// A single dialogue act item, e.g. `inform(food=Chinese)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dai {
    /// Dialogue act type (`inform`, `request`, `hello`, ...).
    pub dat: String,
    /// Slot name, absent for bare acts like `hello()`.
    #[serde(default)]
    pub slot: Option<String>,
    /// Slot value, absent for requests like `request(phone)`.
    #[serde(default)]
    pub value: Option<String>,
}

impl Dai {
    pub fn new(dat: &str, slot: Option<&str>, value: Option<&str>) -> Self {
        Self {
            dat: dat.to_string(),
            slot: slot.map(str::to_string),
            value: value.map(str::to_string),
        }
    }

    /// Act type plus slot, ignoring the value: `inform(food)`.
    pub fn slot_key(&self) -> String {
        match &self.slot {
            Some(slot) => format!("{}({})", self.dat, slot),
            None => format!("{}()", self.dat),
        }
    }
}

impl fmt::Display for Dai {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.slot, &self.value) {
            (Some(slot), Some(value)) => write!(f, "{}({}={})", self.dat, slot, value),
            (Some(slot), None) => write!(f, "{}({})", self.dat, slot),
            _ => write!(f, "{}()", self.dat),
        }
    }
}

/// A dialogue act: an ordered list of items joined by `&`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Da {
    pub dais: Vec<Dai>,
}

impl Da {
    pub fn new(dais: Vec<Dai>) -> Self {
        Self { dais }
    }

    pub fn len(&self) -> usize {
        self.dais.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dais.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dai> {
        self.dais.iter()
    }
}

impl fmt::Display for Da {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, dai) in self.dais.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{dai}")?;
        }
        Ok(())
    }
}

impl FromStr for Da {
    type Err = CorpusError;

    /// Parse `inform(food=Chinese,area=centre)&request(phone)&bye()`.
    ///
    /// Several slots inside one act expand to one item per slot. Quotes
    /// around values are stripped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = || CorpusError::DaSyntax(s.to_string());
        let mut dais = Vec::new();

        for act in s.split('&').map(str::trim).filter(|a| !a.is_empty()) {
            let open = act.find('(').ok_or_else(syntax)?;
            if !act.ends_with(')') {
                return Err(syntax());
            }
            let dat = act[..open].trim();
            if dat.is_empty() {
                return Err(syntax());
            }
            let args = act[open + 1..act.len() - 1].trim();
            if args.is_empty() {
                dais.push(Dai::new(dat, None, None));
                continue;
            }
            for arg in args.split(',').map(str::trim) {
                match arg.split_once('=') {
                    Some((slot, value)) => {
                        let slot = slot.trim();
                        if slot.is_empty() {
                            return Err(syntax());
                        }
                        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                        dais.push(Dai::new(dat, Some(slot), Some(value)));
                    }
                    None if !arg.is_empty() => dais.push(Dai::new(dat, Some(arg), None)),
                    None => return Err(syntax()),
                }
            }
        }
        Ok(Da { dais })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_slot() {
        let da: Da = "inform(food=Chinese)".parse().unwrap();
        assert_eq!(da.dais, vec![Dai::new("inform", Some("food"), Some("Chinese"))]);
    }

    #[test]
    fn test_parse_multi_act() {
        let da: Da = "inform(name=\"Golden Dragon\")&request(phone)&bye()".parse().unwrap();
        assert_eq!(da.len(), 3);
        assert_eq!(da.dais[0].value.as_deref(), Some("Golden Dragon"));
        assert_eq!(da.dais[1], Dai::new("request", Some("phone"), None));
        assert_eq!(da.dais[2], Dai::new("bye", None, None));
    }

    #[test]
    fn test_parse_multi_slot_expands() {
        let da: Da = "inform(food=Chinese, area=centre)".parse().unwrap();
        assert_eq!(da.len(), 2);
        assert_eq!(da.dais[1].slot.as_deref(), Some("area"));
        assert_eq!(da.dais[1].dat, "inform");
    }

    #[test]
    fn test_display_roundtrip() {
        let text = "inform(food=Chinese)&request(phone)&hello()";
        let da: Da = text.parse().unwrap();
        assert_eq!(da.to_string(), text);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("inform(food=Chinese".parse::<Da>().is_err());
        assert!("(food=Chinese)".parse::<Da>().is_err());
        assert!("inform(=Chinese)".parse::<Da>().is_err());
        assert!("inform".parse::<Da>().is_err());
    }

    #[test]
    fn test_parse_empty_is_empty_da() {
        let da: Da = "".parse().unwrap();
        assert!(da.is_empty());
    }

    #[test]
    fn test_slot_key_ignores_value() {
        let dai = Dai::new("inform", Some("food"), Some("Chinese"));
        assert_eq!(dai.slot_key(), "inform(food)");
        assert_eq!(Dai::new("bye", None, None).slot_key(), "bye()");
    }
}
