//! GraphQL envelope types for the upstream page API.
//!
//! The upstream omits fields, sends `null` for empty lists, and mixes string
//! and numeric scalars. Everything here decodes tolerantly: a missing or
//! `null` list is empty, and scalars are read back as strings.

use serde::{Deserialize, Deserializer, Serialize};

// ─── Envelope ────────────────────────────────────────────────────────────────

/// The outer `{ "data": ..., "errors": [...] }` shape of every response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<T> {
  pub data:   Option<T>,
  #[serde(default, deserialize_with = "null_default")]
  pub errors: Vec<GraphqlError>,
}

impl<T> Envelope<T> {
  pub fn has_errors(&self) -> bool { !self.errors.is_empty() }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GraphqlError {
  #[serde(default)]
  pub message: String,
}

// ─── getGUI ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GuiData {
  #[serde(rename = "getGUI")]
  pub get_gui: Option<Gui>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Gui {
  pub user: Option<UserIdentity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
  #[serde(default, deserialize_with = "scalar_string")]
  pub id:       Option<String>,
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub fullname: Option<String>,
  #[serde(default)]
  pub email:    Option<String>,
}

impl Envelope<GuiData> {
  /// The identity the token belongs to, if the probe succeeded.
  pub fn user(&self) -> Option<&UserIdentity> {
    self.data.as_ref()?.get_gui.as_ref()?.user.as_ref()
  }
}

// ─── getPage ─────────────────────────────────────────────────────────────────

/// A `getPage(name, params)` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageQuery {
  pub name:   String,
  pub params: Vec<PageParam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageParam {
  pub name:  String,
  pub value: String,
}

impl PageQuery {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:   name.into(),
      params: Vec::new(),
    }
  }

  pub fn param(
    mut self,
    name: impl Into<String>,
    value: impl Into<String>,
  ) -> Self {
    self.params.push(PageParam {
      name:  name.into(),
      value: value.into(),
    });
    self
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageData {
  #[serde(rename = "getPage")]
  pub get_page: Option<Page>,
}

impl Envelope<PageData> {
  pub fn page(&self) -> Option<&Page> { self.data.as_ref()?.get_page.as_ref() }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Page {
  #[serde(default)]
  pub name:   Option<String>,
  #[serde(default)]
  pub title:  Option<String>,
  #[serde(default, deserialize_with = "null_default")]
  pub scope:  Vec<ScopeEntry>,
  #[serde(default, deserialize_with = "null_default")]
  pub panels: Vec<Panel>,
}

impl Page {
  /// Every scope entry on the page and its panels, page-level first.
  pub fn scopes(&self) -> impl Iterator<Item = &ScopeEntry> {
    self
      .scope
      .iter()
      .chain(self.panels.iter().flat_map(|p| p.scope.iter()))
  }

  /// Every block on the page in document order, nested `childs` included.
  pub fn blocks(&self) -> Vec<&Block> {
    fn walk<'a>(block: &'a Block, out: &mut Vec<&'a Block>) {
      out.push(block);
      for child in &block.childs {
        walk(child, out);
      }
    }
    let mut out = Vec::new();
    for block in self.panels.iter().flat_map(|p| p.blocks.iter()) {
      walk(block, &mut out);
    }
    out
  }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Panel {
  #[serde(default)]
  pub name:   Option<String>,
  #[serde(default, deserialize_with = "null_default")]
  pub scope:  Vec<ScopeEntry>,
  #[serde(default, deserialize_with = "null_default")]
  pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Block {
  #[serde(default)]
  pub name:   Option<String>,
  #[serde(default, rename = "type")]
  pub kind:   Option<String>,
  #[serde(default)]
  pub title:  Option<String>,
  /// Embedded HTML markup, when the block renders a table.
  #[serde(default)]
  pub body:   Option<String>,
  #[serde(default, deserialize_with = "null_default")]
  pub config: Vec<ConfigEntry>,
  #[serde(default, deserialize_with = "null_default")]
  pub childs: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScopeEntry {
  #[serde(default)]
  pub name:  Option<String>,
  #[serde(default, rename = "type")]
  pub kind:  Option<String>,
  #[serde(default, deserialize_with = "scalar_string")]
  pub value: Option<String>,
  #[serde(default, deserialize_with = "null_default")]
  pub array: Vec<ConfigEntry>,
}

/// A recursive name/value node. Tabs, rows and parameters all use it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigEntry {
  #[serde(default)]
  pub name:  Option<String>,
  #[serde(default, rename = "type")]
  pub kind:  Option<String>,
  #[serde(default, deserialize_with = "scalar_string")]
  pub value: Option<String>,
  #[serde(default, deserialize_with = "null_default")]
  pub array: Vec<ConfigEntry>,
}

impl ConfigEntry {
  /// First direct child with the given name.
  pub fn child(&self, name: &str) -> Option<&ConfigEntry> {
    self.array.iter().find(|c| c.name.as_deref() == Some(name))
  }

  /// Direct children as `(name, value)` pairs, skipping unnamed ones.
  pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
    self.array.iter().filter_map(|c| {
      Some((c.name.as_deref()?, c.value.as_deref().unwrap_or_default()))
    })
  }
}

// ─── Tolerant decoding ───────────────────────────────────────────────────────

/// Decode `null` as `T::default()`.
fn null_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

/// Decode a string, number or bool as its string form; anything else as
/// `None`.
fn scalar_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match serde_json::Value::deserialize(de)? {
    serde_json::Value::String(s) => Some(s),
    serde_json::Value::Number(n) => Some(n.to_string()),
    serde_json::Value::Bool(b) => Some(b.to_string()),
    _ => None,
  })
}
