use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetailsRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}
