use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::domain::{Address, CompanyDetail, CompanySummary, QueryKind};
use crate::services::error::SearchError;

const ZERO_RESULTS_ID: &str = "ctl00_cphContent_gdvResultadoBusca_qtpGridview_lblMessage";
const DETAIL_CONTAINER_ID: &str = "dados";
const RESULTS_TABLE_ID: &str = "ctl00_cphContent_gdvResultadoBusca_gdvContent";
const DETAIL_FIELD_PREFIX: &str = "ctl00_cphContent_frmPreVisualiza_lbl";

/// The container whose appearance signals a settled results page for the
/// given query kind.
pub fn results_container_id(kind: QueryKind) -> &'static str {
    match kind {
        QueryKind::Nire => DETAIL_CONTAINER_ID,
        QueryKind::Name => RESULTS_TABLE_ID,
    }
}

/// Live element lookup, governed by the session's implicit-wait budget.
#[async_trait]
pub trait ResultsPage {
    async fn is_present(&self, id: &str) -> bool;
}

/// Blocks until the portal renders either the expected results container
/// or the zero-results message, each lookup polling up to the implicit
/// wait. Neither appearing within budget means the page never settled
/// (or the connection dropped); that is propagated, not treated as an
/// empty result.
pub async fn await_results<P>(page: &P, target_id: &str) -> Result<(), SearchError>
where
    P: ResultsPage + Sync,
{
    if page.is_present(target_id).await {
        return Ok(());
    }
    match page.is_present(ZERO_RESULTS_ID).await {
        true => Ok(()),
        false => Err(SearchError::element_not_found(format!(
            "results container {} (and no zero-results message)",
            target_id
        ))),
    }
}

fn by_id<'a>(doc: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(&format!("#{}", id)).unwrap();
    doc.select(&selector).next()
}

/// Decides whether the query produced results. Target id present means
/// yes; only the zero-results message present means a legitimately empty
/// query (notice emitted); neither present is ambiguous (page still
/// loading, or connection lost) and is propagated for the caller to
/// interpret rather than silently reported as empty.
pub fn detect_results(doc: &Html, target_id: &str) -> Result<bool, SearchError> {
    if by_id(doc, target_id).is_some() {
        return Ok(true);
    }
    match by_id(doc, ZERO_RESULTS_ID) {
        Some(_) => {
            log::info!("A busca não obteve resultados. Verifique o nome ou NIRE fornecido e tente novamente.");
            Ok(false)
        }
        None => Err(SearchError::element_not_found(format!(
            "results container {} (and no zero-results message)",
            target_id
        ))),
    }
}

fn detail_field(doc: &Html, suffix: &str) -> Result<String, SearchError> {
    by_id(doc, &format!("{}{}", DETAIL_FIELD_PREFIX, suffix))
        .map(|el| el.text().collect::<String>())
        .ok_or_else(|| SearchError::element_not_found(format!("detail field {}", suffix)))
}

/// Parses the detail page returned for a NIRE query. `None` means the
/// portal reported zero results. A successful detail page carries every
/// field; one missing fails the whole record.
pub fn parse_detail(html: &str) -> Result<Option<CompanyDetail>, SearchError> {
    let doc = Html::parse_document(html);
    if !detect_results(&doc, DETAIL_CONTAINER_ID)? {
        return Ok(None);
    }

    // The purpose field carries <br>-separated fragments
    let purpose = by_id(&doc, &format!("{}Objeto", DETAIL_FIELD_PREFIX))
        .map(|el| {
            el.text()
                .map(str::trim)
                .filter(|fragment| !fragment.is_empty())
                .collect::<Vec<_>>()
                .join(". ")
        })
        .ok_or_else(|| SearchError::element_not_found("detail field Objeto"))?;

    // The capital field tends to come with runs of padding whitespace
    let capital = detail_field(&doc, "Capital")?
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let detail = CompanyDetail {
        name: detail_field(&doc, "Empresa")?,
        legal_form: detail_field(&doc, "Detalhes")?,
        activity_start: detail_field(&doc, "Atividade")?,
        cnpj: detail_field(&doc, "Cnpj")?,
        state_registration: detail_field(&doc, "Inscricao")?,
        incorporation_date: detail_field(&doc, "Constituicao")?,
        purpose,
        capital,
        address: Address {
            street: detail_field(&doc, "Logradouro")?,
            number: detail_field(&doc, "Numero")?,
            district: detail_field(&doc, "Bairro")?,
            complement: detail_field(&doc, "Complemento")?,
            municipality: detail_field(&doc, "Municipio")?,
            postal_code: detail_field(&doc, "Cep")?,
            state: detail_field(&doc, "Uf")?,
        },
    };

    Ok(Some(detail))
}

/// Parses the results table returned for a name query, first page only,
/// in on-page row order. `None` means the portal reported zero results.
pub fn parse_summaries(html: &str) -> Result<Option<Vec<CompanySummary>>, SearchError> {
    let doc = Html::parse_document(html);
    if !detect_results(&doc, RESULTS_TABLE_ID)? {
        return Ok(None);
    }

    let table = by_id(&doc, RESULTS_TABLE_ID)
        .ok_or_else(|| SearchError::element_not_found("results table"))?;

    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();
    let link_selector = Selector::parse("a").unwrap();

    let mut summaries = Vec::new();

    // First row is the header
    for row in table.select(&row_selector).skip(1) {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        let [nire_cell, name_cell, municipality_cell, ..] = cells[..] else {
            continue;
        };

        let nire = nire_cell
            .select(&link_selector)
            .next()
            .map(|a| a.text().collect::<String>())
            .ok_or_else(|| SearchError::element_not_found("result row NIRE link"))?;
        let name = name_cell.text().collect::<String>().replace('\n', "");
        // Empty municipality cells hold a lone non-breaking space
        let municipality = municipality_cell
            .text()
            .collect::<String>()
            .replace('\u{a0}', "");

        summaries.push(CompanySummary {
            nire,
            name,
            municipality,
        });
    }

    log::info!("Found {} result row(s)", summaries.len());
    Ok(Some(summaries))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use scraper::Html;

    use super::{
        await_results, detect_results, parse_detail, parse_summaries, results_container_id,
        ResultsPage, ZERO_RESULTS_ID,
    };
    use crate::domain::QueryKind;
    use crate::services::error::SearchError;

    /// Records every live lookup so tests can assert each one went
    /// through the wait-governed probe.
    struct ScriptedPage {
        present: Vec<&'static str>,
        probed: Mutex<Vec<String>>,
    }

    impl ScriptedPage {
        fn new(present: Vec<&'static str>) -> Self {
            ScriptedPage {
                present,
                probed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ResultsPage for ScriptedPage {
        async fn is_present(&self, id: &str) -> bool {
            self.probed.lock().unwrap().push(id.to_string());
            self.present.contains(&id)
        }
    }

    const DETAIL_FIXTURE: &str = r#"
        <html><body><div id="dados">
            <span id="ctl00_cphContent_frmPreVisualiza_lblEmpresa">ACME COMERCIO LTDA</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblDetalhes">SOCIEDADE LIMITADA</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblAtividade">01/02/2010</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblCnpj">12.345.678/0001-90</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblInscricao">123.456.789.012</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblConstituicao">15/01/2010</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblObjeto">COMERCIO VAREJISTA<br>IMPORTACAO E EXPORTACAO</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblCapital">R$  1.000,00</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblLogradouro">RUA DAS FLORES</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblNumero">100</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblBairro">CENTRO</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblComplemento">SALA 2</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblMunicipio">SAO PAULO</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblCep">01000-000</span>
            <span id="ctl00_cphContent_frmPreVisualiza_lblUf">SP</span>
        </div></body></html>
    "#;

    const LIST_FIXTURE: &str = r##"
        <html><body>
        <table id="ctl00_cphContent_gdvResultadoBusca_gdvContent">
            <tr><th>NIRE</th><th>Empresa</th><th>Município</th></tr>
            <tr><td><a href="#">35200000001</a></td><td>ACME
COMERCIO LTDA</td><td>SAO PAULO</td></tr>
            <tr><td><a href="#">35200000002</a></td><td>ACME SERVICOS LTDA</td><td>&#160;</td></tr>
            <tr><td><a href="#">35200000003</a></td><td>ACME HOLDING SA</td><td>CAMPINAS</td></tr>
        </table>
        </body></html>
    "##;

    const ZERO_RESULTS_FIXTURE: &str = r#"
        <html><body>
        <span id="ctl00_cphContent_gdvResultadoBusca_qtpGridview_lblMessage">
            Nenhum resultado encontrado.
        </span>
        </body></html>
    "#;

    #[tokio::test]
    async fn await_results_returns_once_container_is_probed_present() {
        let page = ScriptedPage::new(vec!["dados"]);

        await_results(&page, results_container_id(QueryKind::Nire))
            .await
            .unwrap();

        assert_eq!(*page.probed.lock().unwrap(), vec!["dados"]);
    }

    #[tokio::test]
    async fn await_results_settles_on_zero_results_message() {
        let page = ScriptedPage::new(vec![ZERO_RESULTS_ID]);

        await_results(&page, results_container_id(QueryKind::Name))
            .await
            .unwrap();

        let probed = page.probed.lock().unwrap();
        assert_eq!(probed.len(), 2);
        assert_eq!(probed[1], ZERO_RESULTS_ID);
    }

    #[tokio::test]
    async fn await_results_propagates_when_page_never_settles() {
        let page = ScriptedPage::new(vec![]);

        let result = await_results(&page, results_container_id(QueryKind::Name)).await;

        assert!(matches!(
            result,
            Err(SearchError::ElementNotFound { .. })
        ));
    }

    #[test]
    fn detector_finds_present_target() {
        let doc = Html::parse_document(DETAIL_FIXTURE);
        assert!(detect_results(&doc, "dados").unwrap());
    }

    #[test]
    fn detector_reports_false_on_zero_results_message() {
        let doc = Html::parse_document(ZERO_RESULTS_FIXTURE);
        assert!(!detect_results(&doc, "dados").unwrap());
    }

    #[test]
    fn detector_propagates_when_neither_element_present() {
        let doc = Html::parse_document("<html><body><p>loading</p></body></html>");
        let result = detect_results(&doc, "dados");
        assert!(matches!(
            result,
            Err(SearchError::ElementNotFound { .. })
        ));
    }

    #[test]
    fn detail_fixture_yields_full_record() {
        let detail = parse_detail(DETAIL_FIXTURE).unwrap().unwrap();

        assert_eq!(detail.name, "ACME COMERCIO LTDA");
        assert_eq!(detail.legal_form, "SOCIEDADE LIMITADA");
        assert_eq!(detail.activity_start, "01/02/2010");
        assert_eq!(detail.cnpj, "12.345.678/0001-90");
        assert_eq!(detail.state_registration, "123.456.789.012");
        assert_eq!(detail.incorporation_date, "15/01/2010");
        assert_eq!(
            detail.purpose,
            "COMERCIO VAREJISTA. IMPORTACAO E EXPORTACAO"
        );
        assert_eq!(detail.address.street, "RUA DAS FLORES");
        assert_eq!(detail.address.number, "100");
        assert_eq!(detail.address.district, "CENTRO");
        assert_eq!(detail.address.complement, "SALA 2");
        assert_eq!(detail.address.municipality, "SAO PAULO");
        assert_eq!(detail.address.postal_code, "01000-000");
        assert_eq!(detail.address.state, "SP");
    }

    #[test]
    fn capital_whitespace_runs_collapse_to_single_spaces() {
        let detail = parse_detail(DETAIL_FIXTURE).unwrap().unwrap();
        assert_eq!(detail.capital, "R$ 1.000,00");
    }

    #[test]
    fn missing_detail_field_fails_the_whole_record() {
        let truncated = DETAIL_FIXTURE.replace("_lblCnpj", "_lblSomethingElse");
        let result = parse_detail(&truncated);
        assert!(matches!(
            result,
            Err(SearchError::ElementNotFound { .. })
        ));
    }

    #[test]
    fn detail_on_zero_results_page_is_none() {
        assert_eq!(parse_detail(ZERO_RESULTS_FIXTURE).unwrap(), None);
    }

    #[test]
    fn list_fixture_yields_three_rows_in_page_order() {
        let summaries = parse_summaries(LIST_FIXTURE).unwrap().unwrap();

        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].nire, "35200000001");
        assert_eq!(summaries[0].name, "ACMECOMERCIO LTDA");
        assert_eq!(summaries[0].municipality, "SAO PAULO");
        assert_eq!(summaries[1].nire, "35200000002");
        assert_eq!(summaries[2].nire, "35200000003");
        assert_eq!(summaries[2].municipality, "CAMPINAS");
    }

    #[test]
    fn nbsp_only_municipality_maps_to_empty() {
        let summaries = parse_summaries(LIST_FIXTURE).unwrap().unwrap();
        assert_eq!(summaries[1].municipality, "");
    }

    #[test]
    fn list_extraction_is_idempotent() {
        let first = parse_summaries(LIST_FIXTURE).unwrap().unwrap();
        let second = parse_summaries(LIST_FIXTURE).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn list_on_zero_results_page_is_none() {
        assert_eq!(parse_summaries(ZERO_RESULTS_FIXTURE).unwrap(), None);
    }
}
