use std::fmt;

use serde_derive::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingColor {
  Blue,
  Red,
  Yellow,
  Green,
  Purple,
  Sky,
}

impl RingColor {
  pub const ALL: [RingColor; 6] = [
    RingColor::Blue,
    RingColor::Red,
    RingColor::Yellow,
    RingColor::Green,
    RingColor::Purple,
    RingColor::Sky,
  ];

  pub fn get_value(&self) -> &'static str {
    match self {
      RingColor::Blue => "blue",
      RingColor::Red => "red",
      RingColor::Yellow => "yellow",
      RingColor::Green => "green",
      RingColor::Purple => "purple",
      RingColor::Sky => "sky",
    }
  }

  pub fn next(self) -> RingColor {
    let index = Self::ALL.iter().position(|color| *color == self).unwrap_or(0);
    Self::ALL[(index + 1) % Self::ALL.len()]
  }

  /// Picks the hinted color when nobody uses it, otherwise the first free one.
  /// When every color is taken it cycles through the palette.
  pub fn pick(hint: Option<RingColor>, used: &[RingColor]) -> RingColor {
    hint
      .filter(|color| !used.contains(color))
      .or_else(|| Self::ALL.iter().copied().find(|color| !used.contains(color)))
      .unwrap_or_else(|| Self::ALL[used.len() % Self::ALL.len()])
  }
}

impl fmt::Display for RingColor {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.get_value())
  }
}

#[cfg(test)]
mod test {

  use super::RingColor;

  #[test]
  pub fn get_value() {
    assert_eq!(RingColor::Sky.get_value(), "sky");
    assert_eq!(RingColor::Purple.to_string(), "purple");
  }

  #[test]
  pub fn next_wraps_around() {
    assert_eq!(RingColor::Blue.next(), RingColor::Red);
    assert_eq!(RingColor::Sky.next(), RingColor::Blue);
  }

  #[test]
  pub fn pick_honours_free_hint() {
    let used = [RingColor::Blue];
    assert_eq!(RingColor::pick(Some(RingColor::Green), &used), RingColor::Green);
  }

  #[test]
  pub fn pick_skips_used_colors() {
    let used = [RingColor::Blue, RingColor::Red];
    assert_eq!(RingColor::pick(None, &used), RingColor::Yellow);
    assert_eq!(RingColor::pick(Some(RingColor::Red), &used), RingColor::Yellow);
  }

  #[test]
  pub fn pick_cycles_when_exhausted() {
    let used = RingColor::ALL;
    assert_eq!(RingColor::pick(None, &used), RingColor::Blue);
  }
}
