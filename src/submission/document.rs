use chrono::NaiveDate;
use serde::{Deserialize, Serialize, ser::Error as _};

/// A document registration request.
///
/// Serialized as the JSON body of the create-document call. Dates are
/// calendar dates and render as `YYYY-MM-DD`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Tax ID of the participant filing the document.
    pub participant_inn: String,
    /// Document identifier.
    pub doc_id: String,
    /// Document status.
    pub doc_status: String,
    /// Document type.
    pub doc_type: String,
    /// Whether the goods are imported.
    pub import_request: bool,
    /// Tax ID of the owner.
    pub owner_inn: String,
    /// Tax ID of the producer.
    pub producer_inn: String,
    /// Production date.
    pub production_date: NaiveDate,
    /// Production type.
    pub production_type: String,
    /// Product entries, in order.
    pub products: Vec<Product>,
    /// Registration date.
    pub reg_date: NaiveDate,
    /// Registration number.
    pub reg_number: String,
}

/// One product entry of a [`Document`].
///
/// At least one of `uit_code` and `uitu_code` must be set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Certificate document reference.
    pub certificate_document: String,
    /// Certificate document date.
    pub certificate_document_date: NaiveDate,
    /// Certificate document number.
    pub certificate_document_number: String,
    /// Tax ID of the owner.
    pub owner_inn: String,
    /// Tax ID of the producer.
    pub producer_inn: String,
    /// Production date.
    pub production_date: NaiveDate,
    /// Commodity classification code.
    pub tnved_code: String,
    /// Unit identifier code.
    pub uit_code: Option<String>,
    /// Unit identifier code of the packaging.
    pub uitu_code: Option<String>,
}

impl Document {
    /// Encodes the document as a JSON request body.
    ///
    /// # Errors
    ///
    /// Fails if a product has no unit identifier, or if encoding fails.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        if let Some(index) = self
            .products
            .iter()
            .position(|product| product.uit_code.is_none() && product.uitu_code.is_none())
        {
            return Err(serde_json::Error::custom(format!(
                "product {index} has neither uitCode nor uituCode"
            )));
        }

        serde_json::to_vec(self)
    }
}
