//! Canonical class registry: code → name → color, in legend order.
//!
//! Every consumer (counts, matrix, flow graph, map preview) resolves class
//! codes through one registry so names and colors cannot drift apart.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::error::{Error, Result};
use crate::grid::ClassCode;

/// Sentinel used by the coastal landcover rasters.
pub const DEFAULT_NODATA: ClassCode = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub code: ClassCode,
    pub name: String,
    pub color: Rgba,
}

/// Serialized form; validated into a [`ClassRegistry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryDef {
    #[serde(default = "default_nodata")]
    pub nodata: ClassCode,
    pub classes: Vec<ClassInfo>,
}

fn default_nodata() -> ClassCode {
    DEFAULT_NODATA
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RegistryDef", into = "RegistryDef")]
pub struct ClassRegistry {
    nodata: ClassCode,
    classes: Vec<ClassInfo>,
    index: HashMap<ClassCode, usize>,
}

impl ClassRegistry {
    /// Build a registry. Class order is kept as the legend order.
    pub fn new(nodata: ClassCode, classes: Vec<ClassInfo>) -> Result<Self> {
        let mut index = HashMap::with_capacity(classes.len());
        for (i, c) in classes.iter().enumerate() {
            if c.code == nodata || index.insert(c.code, i).is_some() {
                return Err(Error::DuplicateClass(c.code));
            }
        }
        Ok(Self { nodata, classes, index })
    }

    /// Marsh / shrub / ghost forest / forest / cultivated / water classes of
    /// the coastal study area, sentinel −1.
    pub fn coastal() -> Self {
        let classes: Vec<ClassInfo> = [
            (0, "Marsh", Rgba::rgb(0x64, 0x95, 0xED)),
            (1, "Shrub", Rgba::rgb(0x32, 0xCD, 0x32)),
            (2, "Ghost Forest", Rgba::rgb(0x8B, 0x00, 0x00)),
            (3, "Forest", Rgba::rgb(0x00, 0x64, 0x00)),
            (4, "Cultivated Land", Rgba::rgb(0xDA, 0xA5, 0x20)),
            (5, "Water", Rgba::rgb(0x00, 0x00, 0x8B)),
        ]
        .into_iter()
        .map(|(code, name, color)| ClassInfo { code, name: name.to_string(), color })
        .collect();

        let index = classes.iter().enumerate().map(|(i, c)| (c.code, i)).collect();
        Self { nodata: DEFAULT_NODATA, classes, index }
    }

    pub fn nodata(&self) -> ClassCode {
        self.nodata
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Classes in legend order.
    pub fn classes(&self) -> &[ClassInfo] {
        &self.classes
    }

    pub fn codes(&self) -> impl Iterator<Item = ClassCode> + '_ {
        self.classes.iter().map(|c| c.code)
    }

    pub fn get(&self, code: ClassCode) -> Option<&ClassInfo> {
        self.index.get(&code).map(|&i| &self.classes[i])
    }

    /// Legend position of `code`.
    pub fn position(&self, code: ClassCode) -> Option<usize> {
        self.index.get(&code).copied()
    }

    pub fn contains(&self, code: ClassCode) -> bool {
        self.index.contains_key(&code)
    }

    pub fn name(&self, code: ClassCode) -> Option<&str> {
        self.get(code).map(|c| c.name.as_str())
    }

    pub fn color(&self, code: ClassCode) -> Option<Rgba> {
        self.get(code).map(|c| c.color)
    }

    /// Like [`get`](Self::get) but unknown codes are an error.
    pub fn resolve(&self, code: ClassCode) -> Result<&ClassInfo> {
        self.get(code).ok_or(Error::UnknownClass(code))
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::coastal()
    }
}

impl TryFrom<RegistryDef> for ClassRegistry {
    type Error = Error;

    fn try_from(def: RegistryDef) -> Result<Self> {
        Self::new(def.nodata, def.classes)
    }
}

impl From<ClassRegistry> for RegistryDef {
    fn from(r: ClassRegistry) -> Self {
        Self { nodata: r.nodata, classes: r.classes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coastal_registry_order_and_lookup() {
        let r = ClassRegistry::coastal();
        assert_eq!(r.len(), 6);
        assert_eq!(r.codes().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(r.name(2), Some("Ghost Forest"));
        assert_eq!(r.position(5), Some(5));
        assert_eq!(r.nodata(), -1);
        assert!(!r.contains(-1));
    }

    #[test]
    fn duplicate_codes_rejected() {
        let c = |code| ClassInfo { code, name: "x".into(), color: Rgba::rgb(0, 0, 0) };
        assert!(matches!(ClassRegistry::new(-1, vec![c(1), c(1)]), Err(Error::DuplicateClass(1))));
        assert!(matches!(ClassRegistry::new(-1, vec![c(-1)]), Err(Error::DuplicateClass(-1))));
    }

    #[test]
    fn deserializes_from_json_with_default_nodata() {
        let json = r##"{"classes": [
            {"code": 10, "name": "Salt marsh", "color": "#6495ED"},
            {"code": 3, "name": "Forest", "color": "darkgreen"}
        ]}"##;
        let r: ClassRegistry = serde_json::from_str(json).unwrap();
        assert_eq!(r.nodata(), DEFAULT_NODATA);
        assert_eq!(r.codes().collect::<Vec<_>>(), vec![10, 3]);
        assert_eq!(r.color(3), Some(Rgba::rgb(0, 100, 0)));
    }

    #[test]
    fn deserialize_reports_duplicates() {
        let json = r##"{"nodata": 0, "classes": [
            {"code": 1, "name": "a", "color": "#000000"},
            {"code": 1, "name": "b", "color": "#000000"}
        ]}"##;
        assert!(serde_json::from_str::<ClassRegistry>(json).is_err());
    }

    #[test]
    fn resolve_unknown_is_error() {
        let r = ClassRegistry::coastal();
        assert!(matches!(r.resolve(42), Err(Error::UnknownClass(42))));
    }
}
