//! Generate the static site

use anyhow::Result;

use crate::generator::Generator;
use crate::Site;

/// Generate the listing and every post page
pub async fn run(site: &Site) -> Result<()> {
    let start = std::time::Instant::now();

    let generator = Generator::new(site)?;
    let cache = generator.generate().await?;

    let redirects = cache
        .routes
        .values()
        .filter(|entry| entry.redirect.is_some())
        .count();
    tracing::info!(
        "Generated {} pages ({} redirects) in {:.2}s",
        cache.routes.len() - redirects,
        redirects,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
