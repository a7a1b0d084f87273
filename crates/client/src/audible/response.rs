//! Audible catalog and suggestion response types.

use serde::Deserialize;

/// `GET /1.0/catalog/products`: relevance-ordered ASINs only.
#[derive(Debug, Deserialize)]
pub struct ProductsResponse {
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub struct Product {
    pub asin: String,
}

impl ProductsResponse {
    pub fn asins(self) -> Vec<String> {
        self.products.into_iter().map(|p| p.asin).collect()
    }
}

/// `GET /1.0/searchsuggestions`.
#[derive(Debug, Deserialize)]
pub struct SuggestionsResponse {
    pub model: SuggestionItems,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionItems {
    #[serde(default)]
    pub items: Vec<SuggestionItem>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionItem {
    pub model: SuggestionModel,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionModel {
    #[serde(default)]
    pub product_metadata: Option<TitleHolder>,
    #[serde(default)]
    pub title_group: Option<TitleHolder>,
}

#[derive(Debug, Deserialize)]
pub struct TitleHolder {
    pub title: Option<TitleValue>,
}

#[derive(Debug, Deserialize)]
pub struct TitleValue {
    pub value: String,
}

impl SuggestionModel {
    /// Product title, else the title group's title.
    fn title(self) -> Option<String> {
        let product = self.product_metadata.and_then(|m| m.title).map(|t| t.value);
        product.or_else(|| self.title_group.and_then(|g| g.title).map(|t| t.value))
    }
}

impl SuggestionsResponse {
    pub fn titles(self) -> Vec<String> {
        self.model
            .items
            .into_iter()
            .filter_map(|item| item.model.title())
            .filter(|t| !t.is_empty())
            .collect()
    }
}
