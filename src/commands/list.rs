//! List posts from the content API

use anyhow::Result;

use crate::client::ContentClient;
use crate::helpers::DateFormatter;
use crate::pages::Listing;
use crate::Site;

/// Page through every post the same way the listing's "load more" does
pub async fn run(site: &Site) -> Result<()> {
    let client = ContentClient::new(&site.config.api)?;
    let dates = DateFormatter::from_config(&site.config);

    let mut listing = Listing::fetch_first(&client, &site.config).await?;
    while listing.has_more() {
        let added = listing.load_more(&client).await?;
        tracing::debug!("Loaded {} more posts", added);
    }

    println!("Posts ({}):", listing.posts().len());
    for post in listing.posts() {
        println!(
            "  {} - {} [{}]",
            dates.publication_date(post.first_publication_date.as_deref()),
            post.data.title.as_deref().unwrap_or_default(),
            post.uid.as_deref().unwrap_or_default()
        );
    }

    Ok(())
}
