use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Book;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub price: i64,
    pub image: Option<String>,
    pub category_id: Uuid,
    pub active: Option<bool>,
}

/// Stock is deliberately absent: it only moves through imports and orders.
///
/// `description` and `image` distinguish a missing key (keep) from `null`
/// (clear).
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, nullable)]
    pub description: Option<Option<String>>,
    pub price: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>, nullable)]
    pub image: Option<Option<String>>,
    pub category_id: Option<Uuid>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct BookList {
    #[schema(value_type = Vec<Book>)]
    pub items: Vec<Book>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookCount {
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct CategoryStat {
    pub category_id: Uuid,
    pub name: String,
    pub book_count: i64,
    pub total_stock: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryStatList {
    #[schema(value_type = Vec<CategoryStat>)]
    pub items: Vec<CategoryStat>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_tells_missing_fields_from_null() {
        let keep: UpdateBookRequest = serde_json::from_str(r#"{"price": 1000}"#).unwrap();
        assert_eq!(keep.description, None);
        assert_eq!(keep.image, None);

        let clear: UpdateBookRequest =
            serde_json::from_str(r#"{"description": null, "image": null}"#).unwrap();
        assert_eq!(clear.description, Some(None));
        assert_eq!(clear.image, Some(None));

        let set: UpdateBookRequest =
            serde_json::from_str(r#"{"description": "Tap 1"}"#).unwrap();
        assert_eq!(set.description, Some(Some("Tap 1".into())));
    }
}
