// SPDX-License-Identifier: GPL-3.0-or-later

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Image {
   pub file: String,
   /// Control word to write when the table itself carries none
   pub control: Option<u32>,
   /// Control register offset, when it is not the PRISM CTRL register
   pub control_address: Option<u32>,
   #[serde(default)]
   pub retries: u32,
   #[serde(default)]
   pub verify: bool,
}

#[derive(Debug, Deserialize)]
pub struct Config {
   #[serde(default)]
   pub prism: crate::peripherals::prism::PrismConfig,
   /// Widths the validator accepts, if not the built-in set
   pub widths: Option<Vec<u32>>,
   pub images: Vec<Image>,
}
