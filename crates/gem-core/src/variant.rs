//! # Variant Resolution
//!
//! Maps a shopper's in-progress option selection (Metal = Gold, Size = 7) to
//! the concrete variant it names, and decides which option values can still
//! lead to something purchasable so the product page can disable the rest.
//!
//! Everything here is a pure function of the product's options, its variants
//! and the caller-held [`Selection`]; nothing is cached between calls.
//!
//! ## Duplicate combinations
//!
//! Variants of one product are expected to have unique option-value
//! combinations. That invariant is owned by whoever writes the catalog and is
//! not enforced here. When it is broken, [`VariantResolver::resolve`] returns
//! the first matching variant in list order; [`duplicate_combinations`] exists
//! so loaders can report the problem instead of silently living with it.

use crate::product::{Price, ProductOption, ProductVariant, SelectedOption};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Stock at or above this level gets no label
const LOW_STOCK_THRESHOLD: i64 = 5;

/// Option name → chosen value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeMap<String, String>);

impl Selection {
    /// Empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose `value` for `option_name`, replacing any earlier choice
    pub fn set(&mut self, option_name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(option_name.into(), value.into());
    }

    /// Builder form of [`Selection::set`]
    pub fn with(mut self, option_name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(option_name, value);
        self
    }

    /// Drop the choice for `option_name`
    pub fn clear(&mut self, option_name: &str) {
        self.0.remove(option_name);
    }

    /// Chosen value for `option_name`
    pub fn get(&self, option_name: &str) -> Option<&str> {
        self.0.get(option_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when there is one choice per option
    pub fn is_complete(&self, options: &[ProductOption]) -> bool {
        self.len() == options.len() && options.iter().all(|o| self.0.contains_key(&o.name))
    }

    /// Every chosen axis agrees with the variant; unchosen axes are free.
    fn partially_matches(&self, variant: &ProductVariant) -> bool {
        self.iter()
            .all(|(name, value)| variant.value_for(name) == Some(value))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Selection {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Read-only view over one product's options and variants
#[derive(Debug, Clone, Copy)]
pub struct VariantResolver<'a> {
    options: &'a [ProductOption],
    variants: &'a [ProductVariant],
}

impl<'a> VariantResolver<'a> {
    pub fn new(options: &'a [ProductOption], variants: &'a [ProductVariant]) -> Self {
        Self { options, variants }
    }

    /// The variant named by a complete selection.
    ///
    /// Returns `None` while the selection has fewer (or more) entries than the
    /// product has options, and when no variant carries exactly the selected
    /// values. Duplicate combinations resolve to the first in list order.
    pub fn resolve(&self, selection: &Selection) -> Option<&'a ProductVariant> {
        if selection.len() != self.options.len() {
            return None;
        }

        self.variants.iter().find(|variant| {
            self.options.iter().all(|option| {
                matches!(
                    selection.get(&option.name),
                    Some(chosen) if variant.value_for(&option.name) == Some(chosen)
                )
            })
        })
    }

    /// Whether choosing `value` for `option_name` keeps a purchasable variant
    /// reachable given the rest of the current selection.
    pub fn is_value_available(&self, selection: &Selection, option_name: &str, value: &str) -> bool {
        let hypothetical = selection.clone().with(option_name, value);

        self.variants
            .iter()
            .filter(|variant| hypothetical.partially_matches(variant))
            .any(ProductVariant::is_purchasable)
    }

    /// Availability of every value of every option under `selection`.
    pub fn availability(&self, selection: &Selection) -> Vec<OptionAvailability> {
        self.options
            .iter()
            .map(|option| OptionAvailability {
                name: option.name.clone(),
                values: option
                    .values
                    .iter()
                    .map(|v| ValueAvailability {
                        value: v.value.clone(),
                        selected: selection.get(&option.name) == Some(v.value.as_str()),
                        available: self.is_value_available(selection, &option.name, &v.value),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Availability of one option's values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionAvailability {
    pub name: String,
    pub values: Vec<ValueAvailability>,
}

/// One button on the product page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueAvailability {
    pub value: String,
    pub selected: bool,
    pub available: bool,
}

/// Stock badge shown next to a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLabel {
    Unavailable,
    Backorder,
    OutOfStock,
    LowStock(i64),
}

impl StockLabel {
    /// Label for a variant, if any. First applicable rule wins.
    pub fn for_variant(variant: &ProductVariant) -> Option<Self> {
        if !variant.is_available {
            return Some(StockLabel::Unavailable);
        }
        if !variant.track_inventory {
            return None;
        }
        match variant.stock_quantity {
            n if n <= 0 && variant.allow_backorder => Some(StockLabel::Backorder),
            n if n <= 0 => Some(StockLabel::OutOfStock),
            n if n < LOW_STOCK_THRESHOLD => Some(StockLabel::LowStock(n)),
            _ => None,
        }
    }
}

impl std::fmt::Display for StockLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockLabel::Unavailable => f.write_str("unavailable"),
            StockLabel::Backorder => f.write_str("backorder"),
            StockLabel::OutOfStock => f.write_str("out of stock"),
            StockLabel::LowStock(n) => write!(f, "low stock, {} remaining", n),
        }
    }
}

impl Serialize for StockLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What the product page shows for a resolved variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantDisplay {
    pub name: String,
    pub price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_label: Option<StockLabel>,
}

/// Display name, charged price and stock badge for a variant.
pub fn derived_display(variant: &ProductVariant, product_name: &str) -> VariantDisplay {
    let name = if variant.option_values.is_empty() {
        variant
            .sku
            .clone()
            .unwrap_or_else(|| product_name.to_string())
    } else {
        let values: Vec<&str> = variant
            .option_values
            .iter()
            .map(|o| o.value.as_str())
            .collect();
        format!("{} {}", product_name, values.join(" "))
    };

    VariantDisplay {
        name,
        price: variant.effective_price(),
        stock_label: StockLabel::for_variant(variant),
    }
}

/// A combination of option values claimed by more than one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateCombination {
    pub combination: Vec<SelectedOption>,
    /// In list order; the first is what `resolve` returns
    pub variant_ids: Vec<String>,
}

/// Find option-value combinations shared by several variants.
pub fn duplicate_combinations(variants: &[ProductVariant]) -> Vec<DuplicateCombination> {
    let mut seen: BTreeMap<Vec<SelectedOption>, Vec<String>> = BTreeMap::new();

    for variant in variants {
        let mut key = variant.option_values.clone();
        key.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.value.cmp(&b.value)));
        seen.entry(key).or_default().push(variant.id.clone());
    }

    seen.into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(combination, variant_ids)| DuplicateCombination {
            combination,
            variant_ids,
        })
        .collect()
}
