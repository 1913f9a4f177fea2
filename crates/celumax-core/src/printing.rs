//! # Ticket Printing
//!
//! Renders invoices and repair tickets as plain text for a 58mm thermal
//! printer. Transport to the printer is outside this crate; this module only
//! produces the text.
//!
//! ## Template Syntax
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  {{encabezado}}              shop header lines                          │
//! │  Fecha: {{fecha}}            dd/mm/YYYY HH:MM, local time               │
//! │  {{#each articulos}}                                                    │
//! │  {{nombre}} {{cantidad}} {{valor_unitario}} {{total}}                  │
//! │  {{/each}}                   block repeated once per invoice line      │
//! │  TOTAL: {{total_final}}                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unknown placeholders are left untouched.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{InvoiceWithLines, Receipt};

const EACH_START: &str = "{{#each articulos}}";
const EACH_END: &str = "{{/each}}";

/// Column widths of an invoice line on a 32-character roll.
const NAME_WIDTH: usize = 14;
const QTY_WIDTH: usize = 4;
const UNIT_PRICE_WIDTH: usize = 9;
const LINE_TOTAL_WIDTH: usize = 7;

/// Default invoice layout.
pub const DEFAULT_INVOICE_TEMPLATE: &str = "{{encabezado}}
--------------------------------
Fecha: {{fecha}}
Cliente: {{nombre_cliente}}
CC: {{cedula_cliente}}
--------------------------------
Producto       Cant Vr.Unit  Total
{{#each articulos}}
{{nombre}} {{cantidad}} {{valor_unitario}} {{total}}
{{/each}}
--------------------------------
TOTAL: {{total_final}}

Gracias por su compra
";

/// Default repair-ticket layout.
pub const DEFAULT_RECEIPT_TEMPLATE: &str = "{{encabezado}}

Fecha: {{fecha}}
Nombre: {{nombre_cliente}}
CC.: {{cedula_cliente}}
Tel: {{telefono_cliente}}
Equipo: {{equipo}}
Procedimiento: {{procedimiento}}
Valor: {{valor}}
Abono: {{abono}}
Saldo: {{saldo}}

    *   *   *
    *   *   *
    *   *   *      Clave: {{clave}}

Pasados 30 dias no nos hacemos responsables por equipos dejados en reparacion.
";

/// Shop identity printed at the top of every ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopHeader {
    pub name: String,
    pub tagline: String,
    pub address: String,
    pub phones: String,
    pub owner: String,
    pub tax_id: String,
}

impl Default for ShopHeader {
    fn default() -> Self {
        Self {
            name: "CELUMAX".to_string(),
            tagline: "Servicio Técnico Especializado".to_string(),
            address: String::new(),
            phones: String::new(),
            owner: String::new(),
            tax_id: String::new(),
        }
    }
}

impl ShopHeader {
    /// Header lines, skipping fields that are not set.
    pub fn render(&self) -> String {
        let phones = (!self.phones.is_empty()).then(|| format!("Tels: {}", self.phones));
        let tax_id = (!self.tax_id.is_empty()).then(|| format!("Nit: {}", self.tax_id));

        [
            Some(self.name.clone()),
            Some(self.tagline.clone()),
            Some(self.address.clone()),
            phones,
            Some(self.owner.clone()),
            tax_id,
        ]
        .into_iter()
        .flatten()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// Formats a timestamp the way tickets show it: `dd/mm/YYYY HH:MM`.
pub fn format_ticket_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

/// `1234.50` style amount, no currency sign.
fn decimal(amount: Money) -> String {
    let sign = if amount.is_negative() { "-" } else { "" };
    format!("{}{}.{:02}", sign, amount.major().abs(), amount.minor())
}

/// Amount rounded to whole units, half away from zero.
fn whole(amount: Money) -> String {
    let cents = amount.cents();
    let rounded = if cents >= 0 {
        (cents + 50) / 100
    } else {
        (cents - 50) / 100
    };
    rounded.to_string()
}

/// Pads with spaces to `width` characters, cutting anything longer.
fn fit(value: &str, width: usize) -> String {
    let cut: String = value.chars().take(width).collect();
    format!("{:<width$}", cut, width = width)
}

/// Replaces each `{{key}}` found in `template` in one left-to-right pass.
///
/// Inserted values are never scanned again, so a client or product name
/// that happens to contain `{{...}}` prints as typed.
fn fill(template: &str, fields: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };

        let key = &after[..close];
        match fields.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + close + 4]),
        }
        rest = &after[close + 2..];
    }

    out.push_str(rest);
    out
}

/// Renders an invoice with `template`.
pub fn render_invoice(template: &str, header: &ShopHeader, invoice: &InvoiceWithLines) -> String {
    let head = &invoice.invoice;
    let encabezado = header.render();
    let fecha = format_ticket_date(head.created_at);
    let total_final = decimal(head.total());
    let fields = [
        ("encabezado", encabezado.as_str()),
        ("fecha", fecha.as_str()),
        ("nombre_cliente", head.client_name.as_str()),
        ("cedula_cliente", head.client_id.as_str()),
        ("total_final", total_final.as_str()),
    ];

    // The row block is cut out of the raw template before anything is filled
    let block = template.find(EACH_START).and_then(|start| {
        let body = start + EACH_START.len();
        template[body..]
            .find(EACH_END)
            .map(|len| (start, body, body + len))
    });
    let Some((start, body, end)) = block else {
        return fill(template, &fields);
    };

    let row = template[body..end].trim();
    let rows = invoice
        .lines
        .iter()
        .map(|line| {
            let nombre = fit(&line.product_name, NAME_WIDTH);
            let cantidad = fit(&line.quantity.to_string(), QTY_WIDTH);
            let valor_unitario = fit(&whole(line.unit_price()), UNIT_PRICE_WIDTH);
            let total = fit(&whole(line.line_total()), LINE_TOTAL_WIDTH);
            fill(
                row,
                &[
                    ("nombre", nombre.as_str()),
                    ("cantidad", cantidad.as_str()),
                    ("valor_unitario", valor_unitario.as_str()),
                    ("total", total.as_str()),
                ],
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut text = fill(&template[..start], &fields);
    text.push_str(&rows);
    text.push_str(&fill(&template[end + EACH_END.len()..], &fields));
    text
}

/// Renders a repair ticket with `template`.
pub fn render_receipt(template: &str, header: &ShopHeader, receipt: &Receipt) -> String {
    let encabezado = header.render();
    let fecha = format_ticket_date(receipt.registered_at);
    let valor = decimal(receipt.price());
    let abono = decimal(receipt.deposit());
    let saldo = decimal(receipt.balance());
    let clave = receipt
        .device_password
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or("___");

    fill(
        template,
        &[
            ("encabezado", encabezado.as_str()),
            ("fecha", fecha.as_str()),
            ("nombre_cliente", receipt.client_name.as_str()),
            ("cedula_cliente", receipt.client_id.as_str()),
            ("telefono_cliente", receipt.client_phone.as_str()),
            ("equipo", receipt.device_reference.as_str()),
            ("procedimiento", receipt.procedure.as_str()),
            ("valor", valor.as_str()),
            ("abono", abono.as_str()),
            ("saldo", saldo.as_str()),
            ("clave", clave),
        ],
    )
}
