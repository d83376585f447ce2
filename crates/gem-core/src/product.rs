//! # Product Types
//!
//! Catalog types for gemcart: products, their option axes (Metal, Size, ...)
//! and the concrete variants that bind one value per axis to a price and stock
//! record. The catalog is loaded from `config/catalog.toml`.

use crate::variant::{duplicate_combinations, DuplicateCombination, VariantResolver};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported currencies (ISO 4217, all with two minor-unit digits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    CHF,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::CHF => "CHF",
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::CAD => "C$",
            Currency::AUD => "A$",
            Currency::CHF => "CHF ",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "CAD" => Ok(Currency::CAD),
            "AUD" => Ok(Currency::AUD),
            "CHF" => Ok(Currency::CHF),
            other => Err(format!("unsupported currency: {}", other)),
        }
    }
}

/// Price with amount in minor units (cents)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in minor units
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Price {
    /// Create a price from a decimal amount (e.g. `129.50`)
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount: (amount * 100.0).round() as i64,
            currency,
        }
    }

    /// Create a price from minor units
    pub fn from_cents(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self::from_cents(0, currency)
    }

    /// Multiply by a quantity, saturating at the `i64` bounds
    pub fn times(&self, quantity: u32) -> Self {
        Self::from_cents(self.amount.saturating_mul(i64::from(quantity)), self.currency)
    }

    /// Amount with exactly two decimals, no symbol (`"1299.00"`).
    ///
    /// Integer arithmetic only; this is the form sent to the payment provider.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        format!("{}{}.{:02}", sign, abs / 100, abs % 100)
    }

    /// Format for display (e.g., "$10.00")
    pub fn display(&self) -> String {
        format!("{}{}", self.currency.symbol(), self.to_decimal_string())
    }
}

/// How a variant is priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingType {
    /// One flat price per item
    Fixed,
    /// Priced per unit (gram, cm of chain, ...)
    PerUnit,
}

impl Default for PricingType {
    fn default() -> Self {
        PricingType::Fixed
    }
}

/// One concrete choice along an option axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOptionValue {
    /// Literal value (e.g. "Rose Gold")
    pub value: String,
    /// Display ordering
    #[serde(default)]
    pub position: u32,
}

/// A named axis of product variation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    /// Axis label (e.g. "Metal")
    pub name: String,
    /// Display ordering
    #[serde(default)]
    pub position: u32,
    /// Values, sorted by position once the catalog is loaded
    #[serde(default)]
    pub values: Vec<ProductOptionValue>,
}

impl ProductOption {
    /// Create an option whose values take their list order as position
    pub fn new<S: AsRef<str>>(name: impl Into<String>, position: u32, values: &[S]) -> Self {
        Self {
            name: name.into(),
            position,
            values: values
                .iter()
                .enumerate()
                .map(|(i, v)| ProductOptionValue {
                    value: v.as_ref().to_string(),
                    position: i as u32,
                })
                .collect(),
        }
    }

    /// Check whether `value` is one of this option's values
    pub fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.value == value)
    }

    fn sort_values(&mut self) {
        self.values.sort_by_key(|v| v.position);
    }
}

/// A variant's assignment for one option axis
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SelectedOption {
    /// Option name
    pub name: String,
    /// Chosen value
    pub value: String,
}

/// A separately priced and stocked SKU
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Unique variant identifier
    pub id: String,

    /// Stock keeping unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,

    /// Flat price
    pub price: Price,

    /// Original price shown struck through when on sale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<Price>,

    /// Pricing mode
    #[serde(default)]
    pub pricing_type: PricingType,

    /// Price per unit (per-unit pricing only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<Price>,

    /// Unit label, e.g. "gram"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_label: Option<String>,

    /// Minimum order quantity (per-unit pricing only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_quantity: Option<u32>,

    /// Maximum order quantity (per-unit pricing only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_quantity: Option<u32>,

    /// Units on hand
    #[serde(default)]
    pub stock_quantity: i64,

    /// Whether stock is tracked at all
    #[serde(default = "default_true")]
    pub track_inventory: bool,

    /// Whether the variant may be sold at zero stock
    #[serde(default)]
    pub allow_backorder: bool,

    /// Overall availability, independent of stock
    #[serde(default = "default_true")]
    pub is_available: bool,

    /// One value per product option, in option-definition order
    #[serde(default)]
    pub option_values: Vec<SelectedOption>,
}

fn default_true() -> bool {
    true
}

impl ProductVariant {
    /// Create an available, tracked, fixed-price variant with no stock
    pub fn new(id: impl Into<String>, price: Price) -> Self {
        Self {
            id: id.into(),
            sku: None,
            price,
            compare_at_price: None,
            pricing_type: PricingType::Fixed,
            price_per_unit: None,
            unit_label: None,
            min_quantity: None,
            max_quantity: None,
            stock_quantity: 0,
            track_inventory: true,
            allow_backorder: false,
            is_available: true,
            option_values: Vec::new(),
        }
    }

    /// Builder: set SKU
    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    /// Builder: assign a value for an option axis
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.option_values.push(SelectedOption {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Builder: set stock on hand
    pub fn with_stock(mut self, quantity: i64) -> Self {
        self.stock_quantity = quantity;
        self
    }

    /// Builder: allow backorders
    pub fn with_backorder(mut self) -> Self {
        self.allow_backorder = true;
        self
    }

    /// Builder: stop tracking inventory
    pub fn untracked(mut self) -> Self {
        self.track_inventory = false;
        self
    }

    /// Builder: mark unavailable
    pub fn unavailable(mut self) -> Self {
        self.is_available = false;
        self
    }

    /// Builder: set compare-at price
    pub fn with_compare_at(mut self, price: Price) -> Self {
        self.compare_at_price = Some(price);
        self
    }

    /// Builder: switch to per-unit pricing
    pub fn per_unit(mut self, price_per_unit: Price, unit_label: impl Into<String>) -> Self {
        self.pricing_type = PricingType::PerUnit;
        self.price_per_unit = Some(price_per_unit);
        self.unit_label = Some(unit_label.into());
        self
    }

    /// Builder: order quantity bounds for per-unit variants
    pub fn with_quantity_range(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_quantity = min;
        self.max_quantity = max;
        self
    }

    /// The value this variant assigns to `option_name`
    pub fn value_for(&self, option_name: &str) -> Option<&str> {
        self.option_values
            .iter()
            .find(|o| o.name == option_name)
            .map(|o| o.value.as_str())
    }

    /// Whether a shopper can buy this variant right now.
    pub fn is_purchasable(&self) -> bool {
        self.is_available
            && (!self.track_inventory || self.stock_quantity > 0 || self.allow_backorder)
    }

    /// Price actually charged per item.
    pub fn effective_price(&self) -> Price {
        match (self.pricing_type, self.price_per_unit) {
            (PricingType::PerUnit, Some(unit_price)) => unit_price,
            _ => self.price,
        }
    }

    /// Check whether a compare-at price above the current price is set
    pub fn is_on_sale(&self) -> bool {
        self.compare_at_price
            .map(|c| c.amount > self.effective_price().amount)
            .unwrap_or(false)
    }

    /// Order options to follow the product's option definitions
    fn sort_option_values(&mut self, options: &[ProductOption]) {
        self.option_values.sort_by_key(|ov| {
            options
                .iter()
                .position(|o| o.name == ov.name)
                .unwrap_or(usize::MAX)
        });
    }
}

/// A product in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier
    pub id: String,

    /// URL slug
    #[serde(default)]
    pub slug: String,

    /// Display name
    pub name: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Category (rings, necklaces, earrings, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Base price shown on listings
    pub price: Price,

    /// Whether this product is listed
    #[serde(default = "default_true")]
    pub active: bool,

    /// Image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Option axes
    #[serde(default)]
    pub options: Vec<ProductOption>,

    /// Variants
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Create a product with no options or variants
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Price) -> Self {
        let id = id.into();
        Self {
            slug: id.clone(),
            id,
            name: name.into(),
            description: String::new(),
            category: None,
            price,
            active: true,
            image_url: None,
            options: Vec::new(),
            variants: Vec::new(),
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Builder: append an option axis
    pub fn with_option<S: AsRef<str>>(mut self, name: impl Into<String>, values: &[S]) -> Self {
        let position = self.options.len() as u32;
        self.options.push(ProductOption::new(name, position, values));
        self
    }

    /// Builder: append a variant, its option values put in option order
    pub fn with_variant(mut self, mut variant: ProductVariant) -> Self {
        variant.sort_option_values(&self.options);
        self.variants.push(variant);
        self
    }

    /// Find a variant by ID
    pub fn variant(&self, variant_id: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// Resolver over this product's options and variants
    pub fn resolver(&self) -> VariantResolver<'_> {
        VariantResolver::new(&self.options, &self.variants)
    }

    /// Sort options, values and variant assignments into display order.
    pub fn normalize(&mut self) {
        if self.slug.is_empty() {
            self.slug = self.id.clone();
        }
        self.options.sort_by_key(|o| o.position);
        for option in &mut self.options {
            option.sort_values();
        }
        let options = &self.options;
        for variant in &mut self.variants {
            variant.sort_option_values(options);
        }
    }
}

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    #[serde(default)]
    pub products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    /// Add a product to the catalog
    pub fn add(&mut self, mut product: Product) {
        product.normalize();
        self.products.push(product);
    }

    /// Find a product by ID
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Find a product by slug, falling back to ID
    pub fn get_by_slug(&self, slug: &str) -> Option<&Product> {
        self.products
            .iter()
            .find(|p| p.slug == slug)
            .or_else(|| self.get(slug))
    }

    /// Get all active products
    pub fn active_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.active)
    }

    /// Products whose variants repeat an option-value combination.
    pub fn integrity_report(&self) -> Vec<(String, Vec<DuplicateCombination>)> {
        self.products
            .iter()
            .filter_map(|p| {
                let dups = duplicate_combinations(&p.variants);
                (!dups.is_empty()).then(|| (p.id.clone(), dups))
            })
            .collect()
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let mut catalog: Self = toml::from_str(toml_str)?;
        for product in &mut catalog.products {
            product.normalize();
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_decimal_string() {
        assert_eq!(Price::from_cents(1299, Currency::USD).to_decimal_string(), "12.99");
        assert_eq!(Price::from_cents(5, Currency::USD).to_decimal_string(), "0.05");
        assert_eq!(Price::from_cents(120000, Currency::EUR).to_decimal_string(), "1200.00");
        assert_eq!(Price::new(10.0, Currency::USD).to_decimal_string(), "10.00");
    }

    #[test]
    fn test_price_times_saturates() {
        let price = Price::from_cents(i64::MAX / 2, Currency::USD);
        assert_eq!(price.times(3).amount, i64::MAX);
        assert_eq!(Price::new(2.5, Currency::USD).times(4).amount, 1000);
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::new(29.99, Currency::USD).display(), "$29.99");
        assert_eq!(Price::new(19.99, Currency::EUR).display(), "€19.99");
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("usd".parse::<Currency>(), Ok(Currency::USD));
        assert_eq!(" GBP ".parse::<Currency>(), Ok(Currency::GBP));
        assert!("JPY".parse::<Currency>().is_err());
    }

    #[test]
    fn test_effective_price_per_unit() {
        let v = ProductVariant::new("chain", Price::new(50.0, Currency::USD))
            .per_unit(Price::new(2.5, Currency::USD), "cm");
        assert_eq!(v.effective_price(), Price::new(2.5, Currency::USD));

        let mut no_unit_price = v.clone();
        no_unit_price.price_per_unit = None;
        assert_eq!(no_unit_price.effective_price(), Price::new(50.0, Currency::USD));
    }

    #[test]
    fn test_is_purchasable() {
        let usd = Price::new(10.0, Currency::USD);
        assert!(ProductVariant::new("a", usd).with_stock(1).is_purchasable());
        assert!(!ProductVariant::new("b", usd).is_purchasable());
        assert!(ProductVariant::new("c", usd).with_backorder().is_purchasable());
        assert!(ProductVariant::new("d", usd).untracked().is_purchasable());
        assert!(!ProductVariant::new("e", usd).untracked().unavailable().is_purchasable());
    }

    #[test]
    fn test_catalog_from_toml_normalizes_order() {
        let toml = r#"
[[products]]
id = "aurora-ring"
name = "Aurora Ring"
price = { amount = 12000, currency = "USD" }

[[products.options]]
name = "Size"
position = 1
values = [{ value = "7", position = 1 }, { value = "6", position = 0 }]

[[products.options]]
name = "Metal"
position = 0
values = [{ value = "Gold" }]

[[products.variants]]
id = "aurora-gold-6"
sku = "AUR-G-6"
price = { amount = 12000, currency = "USD" }
stock_quantity = 3
option_values = [{ name = "Size", value = "6" }, { name = "Metal", value = "Gold" }]
"#;
        let catalog = ProductCatalog::from_toml(toml).unwrap();
        let product = catalog.get_by_slug("aurora-ring").unwrap();

        assert_eq!(product.options[0].name, "Metal");
        assert_eq!(product.options[1].values[0].value, "6");
        assert_eq!(product.variants[0].option_values[0].name, "Metal");
        assert!(product.variants[0].track_inventory);
        assert!(product.variants[0].is_available);
    }

    #[test]
    fn test_integrity_report_flags_duplicates() {
        let usd = Price::new(10.0, Currency::USD);
        let mut catalog = ProductCatalog::new();
        catalog.add(
            Product::new("studs", "Studs", usd)
                .with_option("Metal", &["Silver"])
                .with_variant(ProductVariant::new("s1", usd).with_option("Metal", "Silver"))
                .with_variant(ProductVariant::new("s2", usd).with_option("Metal", "Silver")),
        );

        let report = catalog.integrity_report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].0, "studs");
    }
}
