//! Integration tests for the batch pipeline, from PDF buffers to export rows.
//!
//! Uses a MockExtractor that maps each buffer to canned pages, so these tests
//! run without poppler-utils.

use liquida_core::aggregate::SkipReason;
use liquida_core::classify::matching_variants;
use liquida_core::error::LiquidaError;
use liquida_core::export::{self, Cell};
use liquida_core::extraction::{load_document, PageContent, PdfExtractor};
use liquida_core::layouts::{builtin, LayoutRegistry};
use liquida_core::model::{LinkedLedger, SaleVoucher};
use liquida_core::{BatchConfig, BatchInput, BatchResult, Pipeline};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

struct MockExtractor {
    documents: HashMap<Vec<u8>, Vec<PageContent>>,
}

impl PdfExtractor for MockExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, LiquidaError> {
        self.documents
            .get(pdf_bytes)
            .cloned()
            .ok_or_else(|| LiquidaError::UnreadableDocument("broken xref table".into()))
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

fn pdf(tag: &str) -> Vec<u8> {
    format!("%PDF-1.4 {tag}").into_bytes()
}

fn page(lines: &[String]) -> Vec<PageContent> {
    vec![PageContent::new(1, lines.to_vec())]
}

fn liquidacion(title: &str, coe: &str) -> Vec<String> {
    [
        format!("                        {title}"),
        format!("C.O.E.: {coe}                                   20/11/2025, VIDELA"),
        "   COMPRADOR                                  VENDEDOR".into(),
        "   Razón Social: ACOPIO DEL SUR              Razón Social: PEREZ JUAN CARLOS".into(),
        "   SOCIEDAD ANONIMA".into(),
        "   Domicilio: Ruta 11 Km 450                  Domicilio: Zona Rural".into(),
        "   Localidad: Videla                          Localidad: San Justo".into(),
        "   C.U.I.T.: 30-71234567-1                    C.U.I.T.: 20-12345678-6".into(),
        "   I.V.A.: Responsable Inscripto              I.V.A.: Responsable Inscripto".into(),
        "Actuó como corredor: NO".into(),
        "MERCADERIA ENTREGADA".into(),
        "   Nro Comprobante    Grado   Factor   Contenido Proteico   Peso".into(),
        "   30012345678        G2      99,50    10,20                12050".into(),
        "Localidad: Videla".into(),
        "CONDICIONES DE LA OPERACION".into(),
        "Grano: Soja    Campaña: 2024-2025".into(),
        "   Cantidad          Precio/Qq        Subtotal         Alíc. IVA     IVA            Total".into(),
        "   120,5 Qq          $ 25.850,00      $ 3.114.925,00   10,5          $ 327.067,13   $ 3.441.992,13".into(),
        "DEDUCCIONES".into(),
        "Concepto                 Base Cálculo   Alícuota   IVA          Total".into(),
        "Comisión o gastos administrativos   $ 31.149,25    21,00%    $ 6.541,34    $ 37.690,59".into(),
        "Secada                   $ 12.000,00    10,50%     $ 1.260,00    $ 13.260,00".into(),
        "Otros exentos            $ 500,00       0%         $ 0,00        $ 500,00".into(),
        "RETENCIONES".into(),
        "Retención IVA                         $ 261.653,70".into(),
        "Retención Ganancias   2%              $ 62.298,50".into(),
        "IMPORTES TOTALES".into(),
        "Percepción IVA                        $ 1.200,00".into(),
    ]
    .to_vec()
}

fn certificado() -> Vec<String> {
    [
        "CERTIFICADO DE DEPOSITO - CPN",
        "C.O.E.: 330200001234",
        "Fecha: 15/03/2025",
        "Planta: Rufino",
        "Depositario: ACOPIO DEL SUR S.A.",
        "C.U.I.T. Depositario: 30-71234567-1",
        "Grano: Maíz      Campaña: 2024/2025",
        "Kilos netos: 30.000,00 Kg",
        "   Nro Comprobante    Grado   Factor   Proteina   Peso (kg)",
        "   30012345678        G1      100,00   9,80       18000",
        "   30012345679        G2      99,00    9,50       12000",
        "Procedencia: Rufino",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn nota_debito() -> Vec<String> {
    [
        "NOTA DE DEBITO                     A",
        "Nº 0003-00001234                   Fecha: 05/12/2025",
        "Razón Social: ACOPIO DEL SUR S.A.",
        "C.U.I.T.: 30-71234567-1",
        "Domicilio: Ruta 11 Km 450",
        "I.V.A.: Responsable Inscripto",
        "Ref. Liquidación C.O.E.: 330229912534",
        "CONCEPTO                 Base Cálculo   Alícuota   IVA          Total",
        "Flete corto              $ 20.000,00    21%        $ 4.200,00   $ 24.200,00",
        "Paritaria                $ 1.000,00     0%         $ 0,00       $ 1.000,00",
        "TOTAL                                                           $ 25.200,00",
        "Percepción IVA 3%        $ 600,00",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// (file name, buffer tag, pages) for every layout variant.
fn corpus() -> Vec<(&'static str, &'static str, Vec<String>)> {
    vec![
        (
            "primaria.pdf",
            "primaria",
            liquidacion("LIQUIDACION PRIMARIA DE GRANOS", "330229912534"),
        ),
        (
            "secundaria.pdf",
            "secundaria",
            liquidacion("LIQUIDACION SECUNDARIA DE GRANOS", "330229912599"),
        ),
        (
            "generica.pdf",
            "generica",
            liquidacion("LIQUIDACION DE GRANOS - FORMULARIO C 1116", "330229900017"),
        ),
        ("cpn.pdf", "cpn", certificado()),
        ("nd.pdf", "nd", nota_debito()),
    ]
}

fn extractor() -> MockExtractor {
    MockExtractor {
        documents: corpus()
            .into_iter()
            .map(|(_, tag, lines)| (pdf(tag), page(&lines)))
            .collect(),
    }
}

fn pipeline() -> Pipeline {
    Pipeline::new(
        LayoutRegistry::builtin().unwrap(),
        builtin::catalog().unwrap(),
        Arc::new(extractor()),
        BatchConfig::default(),
    )
}

fn input(name: &str, tag: &str) -> BatchInput {
    BatchInput::new(name, pdf(tag))
}

fn full_batch() -> Vec<BatchInput> {
    corpus()
        .into_iter()
        .map(|(name, tag, _)| input(name, tag))
        .collect()
}

// ---------------------------------------------------------------------------
// Scenario: primary liquidation, 120.5 quintals
// ---------------------------------------------------------------------------
#[tokio::test]
async fn primary_liquidation_quintals_become_kilograms() {
    let result = pipeline()
        .run_batch(vec![input("primaria.pdf", "primaria")])
        .await
        .unwrap();

    assert!(result.skipped.is_empty(), "skipped: {:?}", result.skipped);
    assert_eq!(result.sales.len(), 1);
    assert_eq!(result.cpn.len(), 1);

    let sale = &result.sales.records()[0];
    assert_eq!(sale.weight_kg, dec!(12050));
    assert_eq!(sale.price_per_kg, dec!(258.50));
    assert_eq!(sale.voucher, SaleVoucher::F1);
    assert_eq!(sale.punto_venta, "3302");
    assert_eq!(sale.numero, "29912534");
    assert_eq!(sale.buyer.razon_social, "ACOPIO DEL SUR SOCIEDAD ANONIMA");
    assert_eq!(sale.buyer.cuit, "30712345671");
    assert_eq!(sale.grain.code, 123);
    assert_eq!(sale.vat, dec!(327067.13));
    assert_eq!(sale.total, dec!(3441992.13));
    assert_eq!(sale.withholdings.iva, dec!(261653.70));
    assert_eq!(sale.withholdings.ganancias, dec!(62298.50));

    let cpn = &result.cpn.records()[0];
    assert_eq!(cpn.weight_kg, dec!(12050));
    assert_eq!(cpn.coe, sale.coe);
    assert_eq!(cpn.price_per_kg, Some(dec!(258.50)));
    assert_eq!(cpn.delivered.len(), 1);
    assert_eq!(cpn.delivered[0].comprobante, "30012345678");
    assert_eq!(cpn.delivered[0].procedencia.as_deref(), Some("Videla"));

    let expense = &result.expenses.records()[0];
    assert_eq!(expense.lines.len(), 3);
    assert_eq!(expense.vat_perception, dec!(1200.00));
    assert_eq!(
        expense.link.as_ref().map(|l| l.ledger),
        Some(LinkedLedger::Sales)
    );
}

// ---------------------------------------------------------------------------
// Scenario: corrupted buffer
// ---------------------------------------------------------------------------
#[tokio::test]
async fn corrupted_buffer_is_skipped_as_unreadable() {
    let result = pipeline()
        .run_batch(vec![BatchInput::new("roto.pdf", vec![0x00, 0x01, 0xFF, 0x7F])])
        .await
        .unwrap();

    assert!(result.sales.is_empty());
    assert!(result.cpn.is_empty());
    assert!(result.expenses.is_empty());
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].filename, "roto.pdf");
    assert!(matches!(
        result.skipped[0].reason,
        SkipReason::UnreadableDocument { .. }
    ));
}

#[tokio::test]
async fn backend_failure_is_skipped_as_unreadable() {
    let result = pipeline()
        .run_batch(vec![
            input("primaria.pdf", "primaria"),
            input("truncado.pdf", "truncado"),
        ])
        .await
        .unwrap();
    assert_eq!(result.sales.len(), 1);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].filename, "truncado.pdf");
}

// ---------------------------------------------------------------------------
// Full batch: every variant, cross-links and export rows
// ---------------------------------------------------------------------------
#[tokio::test]
async fn full_batch_fills_all_ledgers() {
    let result = pipeline().run_batch(full_batch()).await.unwrap();
    assert!(result.skipped.is_empty(), "skipped: {:?}", result.skipped);

    // three liquidations
    assert_eq!(result.sales.len(), 3);
    assert_eq!(result.sales.records()[1].voucher, SaleVoucher::F2);
    // three from liquidations plus the certificate
    assert_eq!(result.cpn.len(), 4);
    // three from liquidations plus the debit note
    assert_eq!(result.expenses.len(), 4);

    let certificate = &result.cpn.records()[3];
    assert_eq!(certificate.coe, "330200001234");
    assert_eq!(certificate.grain.name, "Maíz");
    assert_eq!(certificate.weight_kg, dec!(30000));
    assert_eq!(certificate.price_per_kg, None);
    assert_eq!(certificate.delivered.len(), 2);

    let note = &result.expenses.records()[3];
    assert_eq!(note.punto_venta, "0003");
    assert_eq!(note.numero, "00001234");
    assert_eq!(note.vat_perception, dec!(600.00));
    let link = note.link.as_ref().unwrap();
    assert_eq!(link.ledger, LinkedLedger::Sales);
    assert_eq!(link.coe, "330229912534");

    let exports = export::project(&result);
    // each liquidation: invoice row plus two withholding rows
    assert_eq!(exports.ventas.rows.len(), 9);
    assert_eq!(exports.ventas.cell(0, "Total"), Some(&Cell::from(dec!(3441992.13))));
    assert_eq!(exports.ventas.cell(3, "Cpbte"), Some(&Cell::text("F2")));
    assert_eq!(exports.cpns.rows.len(), 4);
    assert_eq!(exports.mercaderia.rows.len(), 5);
    assert_eq!(
        exports.mercaderia.cell(4, "COMPROBANTE"),
        Some(&Cell::text("3302-00001234"))
    );
    // liquidation: 10.5 %, 21 % and perception; debit note: 21 % and perception
    assert_eq!(exports.gastos.rows.len(), 3 * 3 + 2);
    assert_eq!(exports.gastos.cell(9, "Suc."), Some(&Cell::text("0003")));
    assert_eq!(exports.gastos.cell(9, "Conceptos NG/EX"), Some(&Cell::from(dec!(1000))));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------
#[tokio::test]
async fn same_document_twice_yields_one_record_per_line_item() {
    let result = pipeline()
        .run_batch(vec![
            input("primaria.pdf", "primaria"),
            input("primaria (copia).pdf", "primaria"),
        ])
        .await
        .unwrap();
    assert_eq!(result.sales.len(), 1);
    assert_eq!(result.cpn.len(), 1);
    assert_eq!(result.expenses.len(), 1);
}

#[tokio::test]
async fn same_batch_twice_gives_identical_rows() {
    let first = export::project(&pipeline().run_batch(full_batch()).await.unwrap());
    let second = export::project(&pipeline().run_batch(full_batch()).await.unwrap());
    assert_eq!(first, second);
}

#[test]
fn each_sample_matches_exactly_one_variant() {
    let registry = LayoutRegistry::builtin().unwrap();
    let extractor = extractor();
    let expected = [
        "afip_primaria",
        "afip_secundaria",
        "liquidacion_generica",
        "cpn_certificado",
        "nota_debito",
    ];
    for ((name, tag, _), variant) in corpus().into_iter().zip(expected) {
        let doc = load_document(name, &pdf(tag), &extractor).unwrap();
        assert_eq!(matching_variants(&doc, &registry), vec![variant], "{name}");
    }
}

fn ledger_contents(result: &BatchResult) -> Vec<String> {
    let mut rows: Vec<String> = result
        .sales
        .iter()
        .map(|r| serde_json::to_string(r).unwrap())
        .chain(result.cpn.iter().map(|r| serde_json::to_string(r).unwrap()))
        .chain(result.expenses.iter().map(|r| serde_json::to_string(r).unwrap()))
        .collect();
    rows.sort();
    rows
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn shuffled_inputs_give_same_ledgers(order in Just((0..5).collect::<Vec<usize>>()).prop_shuffle()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let batch = full_batch();
        let shuffled: Vec<BatchInput> = order.iter().map(|&i| batch[i].clone()).collect();

        let baseline = runtime.block_on(pipeline().run_batch(batch)).unwrap();
        let result = runtime.block_on(pipeline().run_batch(shuffled)).unwrap();

        prop_assert_eq!(ledger_contents(&result), ledger_contents(&baseline));
        let names: Vec<&str> = result.sales.iter().map(|s| s.source_name.as_str()).collect();
        let expected: Vec<&str> = order
            .iter()
            .filter(|&&i| i < 3)
            .map(|&i| corpus()[i].0)
            .collect();
        prop_assert_eq!(names, expected);
    }
}
