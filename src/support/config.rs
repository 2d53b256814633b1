//-
// Copyright (c) 2024, the Pecmap authors
//
// This file is part of Pecmap.
//
// Pecmap is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Pecmap is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Pecmap. If not, see <http://www.gnu.org/licenses/>.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Error;

/// Provider conventions used when unwrapping PEC messages.
///
/// The defaults match what the Italian PEC providers actually emit. This can
/// be stored in a TOML file (conventionally `pecmap.toml`); every field is
/// optional.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PecConfig {
    /// The literal marker providers prepend to the subject of the outer
    /// envelope.
    ///
    /// It is stripped (along with surrounding whitespace) from the envelope
    /// view of the subject.
    pub subject_prefix: String,

    /// The charset assumed for text parts which do not declare one.
    pub default_charset: String,

    /// How the real sender is recovered from the envelope `From`.
    pub sender: SenderConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SenderConfig {
    /// Marker in the display name announcing that the envelope was sent "on
    /// behalf of" the address that follows.
    pub on_behalf_marker: String,

    /// Display names containing this are provider boilerplate and never
    /// shown in place of the address.
    pub provider_noise: String,
}

impl Default for PecConfig {
    fn default() -> Self {
        PecConfig {
            subject_prefix: "POSTA CERTIFICATA:".to_owned(),
            default_charset: "UTF-8".to_owned(),
            sender: SenderConfig::default(),
        }
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            on_behalf_marker: "Per conto di:".to_owned(),
            provider_noise: "posta-certificata@".to_owned(),
        }
    }
}

impl PecConfig {
    /// Load the configuration from the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse the configuration from TOML text.
    pub fn parse(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(PecConfig::default(), PecConfig::parse("").unwrap());
    }

    #[test]
    fn partial_override() {
        let config = PecConfig::parse(
            "\
subject_prefix = \"ANOMALIA MESSAGGIO:\"

[sender]
provider_noise = \"noreply@\"
",
        )
        .unwrap();

        assert_eq!("ANOMALIA MESSAGGIO:", config.subject_prefix);
        assert_eq!("UTF-8", config.default_charset);
        assert_eq!("Per conto di:", config.sender.on_behalf_marker);
        assert_eq!("noreply@", config.sender.provider_noise);
    }

    #[test]
    fn bad_toml_is_config_error() {
        match PecConfig::parse("subject_prefix = [") {
            Err(Error::Config(_)) => (),
            r => panic!("Unexpected result: {:?}", r),
        }
    }
}
