use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::ImageFormat;
use thirtyfour::{By, ChromiumLikeCapabilities, DesiredCapabilities, Key, WebDriver};

use crate::configuration::WebdriverSettings;
use crate::domain::SearchQuery;
use crate::services::captcha::{CaptchaPage, Challenge};
use crate::services::error::SearchError;
use crate::services::results::ResultsPage;

const PORTAL_URL: &str = "http://www.institucional.jucesp.sp.gov.br/";
const SEARCH_LINK_TEXT: &str =
    "Pesquisa de empresas no banco de dados da Junta Comercial do Estado de São Paulo.";
const SEARCH_FIELD_ID: &str = "ctl00_cphContent_frmBuscaSimples_txtPalavraChave";

const CAPTCHA_IMAGE_XPATH: &str =
    r#"//*[@id="formBuscaAvancada"]/table/tbody/tr[1]/td/div/div[1]/img"#;
const CAPTCHA_FIELD_NAME: &str = "ctl00$cphContent$gdvResultadoBusca$CaptchaControl1";

/// One exclusively-owned browser session against the JUCESP portal.
pub struct Droid {
    pub driver: WebDriver,
}

impl Droid {
    pub async fn new(
        settings: &WebdriverSettings,
        element_wait: Duration,
    ) -> Result<Self, SearchError> {
        let mut caps = DesiredCapabilities::chrome();
        if settings.headless {
            caps.set_headless()?;
        }
        // Large window so the CAPTCHA lands inside the screenshot
        caps.add_arg(&format!("--window-size={}", settings.window_size))?;
        caps.add_arg("--log-level=3")?;

        let driver = WebDriver::new(&settings.url, caps).await?;
        driver.set_implicit_wait_timeout(element_wait).await?;

        Ok(Droid { driver })
    }

    /// Opens the portal landing page, follows the search link and submits
    /// the query. A missing element here means the page shape changed or
    /// the site is unreachable; it is fatal and never retried.
    pub async fn open_and_search(&self, query: &SearchQuery) -> Result<(), SearchError> {
        self.driver.goto(PORTAL_URL).await?;

        let link = self
            .driver
            .find(By::LinkText(SEARCH_LINK_TEXT))
            .await
            .map_err(|_| SearchError::element_not_found("search page link"))?;
        link.click().await?;

        let field = self
            .driver
            .find(By::Id(SEARCH_FIELD_ID))
            .await
            .map_err(|_| SearchError::element_not_found("search input field"))?;
        field.send_keys(query.as_str()).await?;
        field.send_keys(Key::Enter + "").await?;

        log::info!("Submitted search for: {}", query.as_str());
        Ok(())
    }

    pub async fn page_source(&self) -> Result<String, SearchError> {
        Ok(self.driver.source().await?)
    }

    pub async fn quit(self) -> Result<(), SearchError> {
        self.driver.quit().await?;
        Ok(())
    }
}

#[async_trait]
impl ResultsPage for Droid {
    /// Polls for the element under the session's implicit wait, so slow
    /// connections get the configured budget before the page is declared
    /// unsettled.
    async fn is_present(&self, id: &str) -> bool {
        self.driver.find(By::Id(id)).await.is_ok()
    }
}

#[async_trait]
impl CaptchaPage for Droid {
    /// Probes for the challenge image and its answer field. Either one
    /// missing means the challenge is gone (never appeared, or already
    /// dismissed), which is the only positive resolution signal the
    /// portal gives us.
    async fn challenge(&self) -> Result<Option<Challenge>, SearchError> {
        let captcha_img = match self.driver.find(By::XPath(CAPTCHA_IMAGE_XPATH)).await {
            Ok(element) => element,
            Err(_) => return Ok(None),
        };
        if self.driver.find(By::Name(CAPTCHA_FIELD_NAME)).await.is_err() {
            return Ok(None);
        }

        let rect = captcha_img.rect().await?;
        let screenshot = self.driver.screenshot_as_png().await?;

        let full_page = image::load_from_memory(&screenshot)?;
        let crop = full_page.crop_imm(
            rect.x.round().max(0.0) as u32,
            rect.y.round().max(0.0) as u32,
            rect.width.round() as u32,
            rect.height.round() as u32,
        );

        let mut png = Vec::new();
        crop.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        Ok(Some(Challenge { image: png }))
    }

    async fn submit_answer(&self, answer: &str) -> Result<(), SearchError> {
        let field = self
            .driver
            .find(By::Name(CAPTCHA_FIELD_NAME))
            .await
            .map_err(|_| SearchError::element_not_found("captcha answer field"))?;
        field.send_keys(answer).await?;
        field.send_keys(Key::Enter + "").await?;
        Ok(())
    }
}
