use std::io::{self, Write};
use std::time::Duration;

use async_trait::async_trait;
use image::imageops::FilterType;

use crate::services::error::SearchError;

/// Magnification applied to the cropped challenge before showing it.
const DISPLAY_SCALE: f32 = 1.5;

/// One pending visual challenge, cropped out of a full-page screenshot.
pub struct Challenge {
    /// PNG bytes of the challenge region only.
    pub image: Vec<u8>,
}

/// The page-side half of the CAPTCHA loop. `challenge` returning `None`
/// is the only success signal the portal gives: the element disappearing
/// means the last answer was accepted.
#[async_trait]
pub trait CaptchaPage {
    async fn challenge(&self) -> Result<Option<Challenge>, SearchError>;
    async fn submit_answer(&self, answer: &str) -> Result<(), SearchError>;
}

/// Produces an answer for a challenge image. The production impl blocks
/// on console input; tests substitute a scripted double.
pub trait ChallengeResolver {
    fn resolve(&mut self, image: &[u8], attempt: u32) -> Result<String, SearchError>;
}

/// Runs the bounded human-in-the-loop resolution cycle. The initial
/// settle sleep lets the challenge image finish rendering before the
/// first probe. Returns `Ok` as soon as the challenge element is gone;
/// spending the whole attempt budget without it disappearing is fatal.
pub async fn resolve_captcha<P, R>(
    page: &P,
    resolver: &mut R,
    settle: Duration,
    max_attempts: u32,
) -> Result<(), SearchError>
where
    P: CaptchaPage + Sync,
    R: ChallengeResolver,
{
    tokio::time::sleep(settle).await;

    let mut attempts = 0;
    while attempts < max_attempts {
        let challenge = match page.challenge().await? {
            Some(challenge) => challenge,
            None => {
                log::info!("CAPTCHA resolved after {} attempt(s)", attempts);
                return Ok(());
            }
        };

        let answer = resolver.resolve(&challenge.image, attempts)?;
        page.submit_answer(&answer).await?;
        attempts += 1;

        log::info!("Submitted CAPTCHA answer, attempt {}", attempts);
        tokio::time::sleep(settle).await;
    }

    log::error!("CAPTCHA attempt budget spent without resolution");
    Err(SearchError::CaptchaExhausted { attempts })
}

/// Shows the magnified challenge to the operator and reads the answer
/// from stdin. Blocks the whole pipeline until the operator responds,
/// which is the point: there is no automatic solver.
pub struct ConsoleResolver;

impl ChallengeResolver for ConsoleResolver {
    fn resolve(&mut self, image: &[u8], attempt: u32) -> Result<String, SearchError> {
        let challenge = image::load_from_memory(image)?;
        let magnified = challenge.resize(
            (challenge.width() as f32 * DISPLAY_SCALE) as u32,
            (challenge.height() as f32 * DISPLAY_SCALE) as u32,
            FilterType::Triangle,
        );

        let path = std::env::temp_dir().join("jucesp-captcha.png");
        magnified.save(&path)?;
        println!("CAPTCHA salvo em: {}", path.display());

        if attempt > 0 {
            println!("Resposta anterior incorreta, tente novamente.");
        }
        print!("Digite o captcha: ");
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;

        // Tear the displayed crop down before submitting
        let _ = std::fs::remove_file(&path);

        Ok(answer.trim().to_string())
    }
}
