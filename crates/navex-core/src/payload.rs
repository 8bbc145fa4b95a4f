//! Payload builder
//!
//! Pure transformation from an [`OrderSnapshot`] into the carrier's flat
//! shipment schema. No I/O and no failure mode: missing order fields
//! degrade to empty strings or zero.
//!
//! Two field-selection policies exist because the carrier integration grew
//! two call sites that disagree on shipping vs billing fallbacks. Both are
//! kept as-is; see [`FieldPolicy`].

use serde::Serialize;

use crate::order::{Address, OrderId, OrderSnapshot};
use crate::sanitize;

/// Which order fields feed region, city, address and phone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Single-order "get code" and the automatic request on `processing`:
    /// shipping state, billing city, shipping address, billing phone.
    /// No fallbacks.
    OnDemand,
    /// Bulk ship: shipping value, falling back to
    /// billing when the shipping value is empty. Region mirrors the city.
    Bulk,
}

/// Carrier shipment request, one per call, never persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentRequest {
    pub prix: f64,
    pub nom: String,
    pub gouvernerat: String,
    pub ville: String,
    pub adresse: String,
    pub tel: String,
    pub tel2: String,
    pub designation: String,
    pub nb_article: usize,
    pub msg: String,
    pub echange: u8,
    pub article: String,
    pub nb_echange: u8,
    pub ouvrir: &'static str,
    pub code_suivi: String,
    pub order_id: OrderId,
    pub customer_name: String,
    pub shipping_address: Address,
}

impl ShipmentRequest {
    /// Ordered form fields as sent over the wire
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = vec![
            ("prix".into(), format_amount(self.prix)),
            ("nom".into(), self.nom.clone()),
            ("gouvernerat".into(), self.gouvernerat.clone()),
            ("ville".into(), self.ville.clone()),
            ("adresse".into(), self.adresse.clone()),
            ("tel".into(), self.tel.clone()),
            ("tel2".into(), self.tel2.clone()),
            ("designation".into(), self.designation.clone()),
            ("nb_article".into(), self.nb_article.to_string()),
            ("msg".into(), self.msg.clone()),
            ("echange".into(), self.echange.to_string()),
            ("article".into(), self.article.clone()),
            ("nb_echange".into(), self.nb_echange.to_string()),
            ("ouvrir".into(), self.ouvrir.to_string()),
            ("code_suivi".into(), self.code_suivi.clone()),
            ("order_id".into(), self.order_id.to_string()),
            ("customer_name".into(), self.customer_name.clone()),
        ];

        let a = &self.shipping_address;
        for (key, value) in [
            ("first_name", &a.first_name),
            ("last_name", &a.last_name),
            ("address_1", &a.address_1),
            ("city", &a.city),
            ("state", &a.state),
            ("phone", &a.phone),
        ] {
            fields.push((format!("shipping_address[{}]", key), value.clone()));
        }

        fields
    }
}

/// Build the carrier request for `order`
pub fn build(order: &OrderSnapshot, designation: &str, policy: FieldPolicy) -> ShipmentRequest {
    let shipping = &order.shipping;
    let billing = &order.billing;

    let (gouvernerat, ville, adresse, tel) = match policy {
        FieldPolicy::OnDemand => (
            shipping.state.as_str(),
            billing.city.as_str(),
            shipping.address_1.as_str(),
            billing.phone.as_str(),
        ),
        FieldPolicy::Bulk => {
            let city = prefer(&shipping.city, &billing.city);
            (
                city,
                city,
                prefer(&shipping.address_1, &billing.address_1),
                prefer(&shipping.phone, &billing.phone),
            )
        }
    };

    let tel = sanitize::text_field(tel);

    ShipmentRequest {
        prix: parse_amount(&order.total),
        nom: sanitize::text_field(&format!("{} {}", shipping.first_name, shipping.last_name)),
        gouvernerat: sanitize::text_field(gouvernerat),
        ville: sanitize::text_field(ville),
        adresse: sanitize::textarea_field(adresse),
        tel2: tel.clone(),
        tel,
        designation: sanitize::textarea_field(designation),
        nb_article: order.items.len(),
        msg: sanitize::textarea_field(&order.customer_note),
        echange: 0,
        article: sanitize::text_field(&item_list(order)),
        nb_echange: 0,
        ouvrir: "oui",
        code_suivi: String::new(),
        order_id: order.id.clone(),
        customer_name: order.formatted_shipping_name(),
        shipping_address: shipping.clone(),
    }
}

/// Item names in the format the carrier has always received: every name is
/// prefixed with `,` and every name after the first gets one more `,`.
///
/// `["Shirt", "Hat"]` becomes `",Shirt,,Hat"`.
fn item_list(order: &OrderSnapshot) -> String {
    let mut list = String::new();
    for (index, item) in order.items.iter().enumerate() {
        if index != 0 {
            list.push(',');
        }
        list.push(',');
        list.push_str(&item.name);
    }
    list
}

fn prefer<'a>(primary: &'a str, fallback: &'a str) -> &'a str {
    if primary.trim().is_empty() {
        fallback
    } else {
        primary
    }
}

/// Leading decimal number of `raw`, zero when there is none
fn parse_amount(raw: &str) -> f64 {
    let raw = raw.trim();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in raw.char_indices() {
        let ok = c.is_ascii_digit()
            || (i == 0 && (c == '-' || c == '+'))
            || (c == '.' && !seen_dot);
        if !ok {
            break;
        }
        seen_dot |= c == '.';
        end = i + c.len_utf8();
    }
    raw[..end]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// `30.0` → `"30"`, `12.5` → `"12.5"`
fn format_amount(amount: f64) -> String {
    if amount.is_finite() {
        format!("{}", amount)
    } else {
        "0".to_string()
    }
}
