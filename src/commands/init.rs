//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }

    // Create directory structure
    fs::create_dir_all(target_dir.join("source/images"))?;

    let config_content = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
language: pt_BR
timezone: ''

# URL
url: http://localhost:4000
root: /

# Directory
source_dir: source
public_dir: public
post_dir: post

# Date / Time format (Moment.js style)
date_format: DD MMM YYYY

# Listing
per_page: 2

# Seconds before a served page is regenerated
revalidate: 1800

# Content API
## PRISMIC_API_ENDPOINT and PRISMIC_ACCESS_TOKEN override these
api:
  endpoint: ''
  access_token:
  document_type: post
"#;

    fs::write(&config_path, config_content)?;
    fs::write(target_dir.join("source/images/logo.svg"), LOGO_SVG)?;

    Ok(())
}

const LOGO_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="240" height="26" viewBox="0 0 240 26">
  <text x="0" y="20" fill="#ff57b2" font-family="Inter, sans-serif" font-size="22" font-weight="700">spacetraveling.</text>
</svg>
"##;
