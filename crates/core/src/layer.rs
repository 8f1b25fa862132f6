//! Layer name ↔ Z index mapping.
//!
//! Boards describe their copper stack either with canonical Z indices
//! (`0..layer_count`) or with layer names. Names follow the usual PCB
//! convention: `"top"` is layer 0, `"bottom"` is the last layer and
//! `"innerN"` anchors to index `N`. Anything else fills the leftover slots
//! in a stable lexicographic order so repeated solves always see the same
//! assignment.

use std::collections::HashMap;

use crate::{Error, Result};

/// Sort key used to canonicalize layer names.
///
/// Rank 0 = top, 1 = innerN (by N), 2 = unrecognized names (by name),
/// 3 = bottom.
fn layer_sort_key(name: &str) -> (u8, i64, String) {
    let lower = name.to_ascii_lowercase();
    if lower == "top" {
        return (0, 0, String::new());
    }
    if lower == "bottom" {
        return (3, 0, String::new());
    }
    if let Some(n) = lower.strip_prefix("inner").and_then(|s| s.parse::<i64>().ok()) {
        return (1, n, String::new());
    }
    (2, 0, lower)
}

/// Immutable name → Z index map, built once per solve.
#[derive(Debug, Clone)]
pub struct LayerMap {
    layer_count: usize,
    index_by_name: HashMap<String, usize>,
}

impl LayerMap {
    /// Builds a map for a board with `layer_count` layers from the set of
    /// layer names referenced by its obstacles. Duplicate names collapse;
    /// more distinct names than layers is a configuration error.
    pub fn new<I, S>(layer_count: usize, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if layer_count == 0 {
            return Err(Error::ConfigError("layer_count must be at least 1".into()));
        }

        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if !unique.iter().any(|n| n == name) {
                unique.push(name.to_owned());
            }
        }
        if unique.len() > layer_count {
            return Err(Error::InvalidLayer(format!(
                "{} distinct layer names referenced but the board has only {} layers",
                unique.len(),
                layer_count
            )));
        }
        unique.sort_by_key(|n| layer_sort_key(n));

        // "top", "bottom" and "innerN" anchor to their canonical stack
        // positions even when only a subset of layers is referenced; the
        // remaining names fill the leftover slots in sorted order.
        let mut index_by_name = HashMap::with_capacity(unique.len());
        let mut taken = vec![false; layer_count];
        let mut free_form: Vec<&str> = Vec::new();
        for name in &unique {
            let lower = name.to_ascii_lowercase();
            let anchor = if lower == "top" {
                Some(0)
            } else if lower == "bottom" {
                Some(layer_count - 1)
            } else if let Some(n) = lower
                .strip_prefix("inner")
                .and_then(|s| s.parse::<usize>().ok())
            {
                if n == 0 || n + 1 >= layer_count {
                    return Err(Error::InvalidLayer(format!(
                        "layer \"{name}\" does not exist in a {layer_count}-layer stack"
                    )));
                }
                Some(n)
            } else {
                None
            };
            match anchor {
                Some(z) => {
                    if taken[z] {
                        return Err(Error::InvalidLayer(format!(
                            "layer name \"{name}\" conflicts with an earlier name for layer {z}"
                        )));
                    }
                    taken[z] = true;
                    index_by_name.insert(name.clone(), z);
                }
                None => free_form.push(name),
            }
        }
        let mut next = 0;
        for name in free_form {
            while taken[next] {
                next += 1;
            }
            taken[next] = true;
            index_by_name.insert(name.to_owned(), next);
        }

        Ok(Self {
            layer_count,
            index_by_name,
        })
    }

    /// Number of layers in the board stack.
    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// Resolves a layer name to its Z index. Unknown names are a
    /// configuration error, never clamped.
    pub fn resolve(&self, name: &str) -> Result<usize> {
        self.index_by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::InvalidLayer(format!("unknown layer name \"{name}\"")))
    }

    /// Validates an explicit Z index against the stack.
    pub fn check_index(&self, z: usize) -> Result<usize> {
        if z >= self.layer_count {
            return Err(Error::InvalidLayer(format!(
                "layer index {z} out of range 0..{}",
                self.layer_count
            )));
        }
        Ok(z)
    }

    /// Canonical label for a Z index, used on output mesh nodes.
    pub fn label_for(&self, z: usize) -> String {
        if z == 0 {
            "top".to_owned()
        } else if z + 1 == self.layer_count {
            "bottom".to_owned()
        } else {
            format!("inner{z}")
        }
    }
}
