//! Snapshot source for a seller's eBay listings.
//!
//! The seller search results page is scraped with `scraper`. Each result
//! becomes an entity keyed by its item number, with the price, bid count and
//! "time left" text parsed into attributes. The "time left" text is also the
//! only signal for the ending-soon thresholds: it reads `2d 4h left`,
//! `5h 12m left` or `38m left`, and only the unit of its first word matters.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest_middleware::ClientWithMiddleware;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::traits::{SnapshotSource, SourceError};
use crate::{
    config::EbaySourceConfig,
    engine::{Rule, RuleSet, RuleSetError},
    models::{Entity, EntityKey, NotificationMessage, attr},
};

/// The placeholder result eBay injects into some result pages.
const PLACEHOLDER_ITEM: &str = "123456";

/// Template of a listing's link, for messages rendered after the listing is
/// gone from the results.
const LINK: &str = r#"{{ item.link | default("https://www.ebay.co.uk/itm/" ~ key) }}"#;

mod selectors {
    pub const RESULTS: &str = "ul.srp-results, div.srp-river-results";
    pub const ITEM: &str = "div.s-item__wrapper";
    pub const ITEM_LINK: &str = "div.s-item__image a";
    pub const ITEM_IMAGE: &str = "div.s-item__image-wrapper img.s-item__image-img";
    pub const ITEM_TITLE: &str = "div.s-item__title span";
    pub const ITEM_PRICE: &str = "div.s-item__detail span.s-item__price";
    pub const ITEM_BIDS: &str = "div.s-item__detail span.s-item__bids";
    pub const ITEM_BUY_IT_NOW: &str = "div.s-item__detail span.s-item__buyItNowOption";
    pub const ITEM_PURCHASE_OPTIONS: &str =
        "div.s-item__detail span.s-item__purchaseOptionsWithIcon";
    pub const ITEM_TIME_LEFT: &str = "div.s-item__detail span.s-item__time-left";

    pub const PAGE_IMAGE: &str = r#"meta[name="twitter:image"]"#;
    pub const PAGE_TITLE: &str = r#"meta[name="twitter:title"]"#;
    pub const SUMMARY_PANEL: &str = "div#LeftSummaryPanel";
    pub const SUMMARY_PRICE: &str = "div.x-price-primary span.ux-textspans";
    pub const SUMMARY_BIDS: &str = "div.x-bid-count span.ux-textspans";
    pub const SUMMARY_BUY_IT_NOW: &str = "div.x-bin-action span.ux-call-to-action__text";
    pub const SUMMARY_TIME_LEFT: &str = "span.ux-timer__text";
    pub const ENDED_CONTENT: &str = "div#mainContent";
    pub const ENDED_PRICE: &str = "div.vi-price-np span.vi-VR-cvipPrice";
    pub const ENDED_BIDS: &str = "div.vi-cvip-bidt1 a span";
}

/// Fetches a seller's current listings.
pub struct EbayListingsSource {
    client: Arc<ClientWithMiddleware>,
    base_url: Url,
    seller: String,
    max_results: u32,
}

impl EbayListingsSource {
    /// Creates a source from its configuration.
    pub fn new(
        client: Arc<ClientWithMiddleware>,
        config: &EbaySourceConfig,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client,
            base_url: Url::parse(&config.base_url)?,
            seller: config.seller.clone(),
            max_results: config.max_results,
        })
    }

    fn search_url(&self) -> Result<Url, SourceError> {
        let mut url = self.base_url.join("sch/i.html")?;
        url.query_pairs_mut()
            .append_pair("_sofindtype", "0")
            .append_pair("_byseller", "1")
            .append_pair("_fss", "1")
            .append_pair("_fsradio", "&LH_SpecificSeller=1")
            .append_pair("_saslop", "1")
            .append_pair("_sasl", &self.seller)
            .append_pair("_sop", "1")
            .append_pair("_ipg", &self.max_results.to_string())
            .append_pair("_dmd", "1");
        Ok(url)
    }

    fn item_url(&self, key: &str) -> Result<Url, SourceError> {
        Ok(self.base_url.join(&format!("itm/{key}"))?)
    }

    /// Loads a page, bypassing any intermediate cache.
    #[tracing::instrument(skip(self), level = "debug")]
    async fn load_page(&self, mut url: Url) -> Result<String, SourceError> {
        let nonce = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        url.query_pairs_mut().append_pair("nocache", &nonce.to_string());
        tracing::debug!(url = %url, "Loading page.");

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    /// Parses a search results page into listings.
    pub fn parse_listings(&self, html: &str) -> Result<Vec<Entity>, SourceError> {
        let document = Html::parse_document(html);
        let item_selector = selector(selectors::ITEM)?;

        let mut listings = Vec::new();
        let mut items_seen = 0usize;
        for item in document.select(&item_selector) {
            items_seen += 1;
            let Some(href) = select_attr(item, selectors::ITEM_LINK, "href")? else {
                tracing::debug!("Skipping result without a link.");
                continue;
            };
            let key = item_number(&href);
            if key.is_empty() || key == PLACEHOLDER_ITEM {
                continue;
            }

            let title = select_text(item, selectors::ITEM_TITLE)?;
            let price = select_text(item, selectors::ITEM_PRICE)?;
            let (Some(title), Some(price)) = (title, price) else {
                tracing::debug!(key, "Skipping result without title or price.");
                continue;
            };

            let buy_it_now = match select_text(item, selectors::ITEM_BUY_IT_NOW)? {
                Some(text) => Some(text),
                None => select_text(item, selectors::ITEM_PURCHASE_OPTIONS)?,
            };

            listings.push(self.listing(
                &key,
                RawListing {
                    title: Some(title),
                    image: select_attr(item, selectors::ITEM_IMAGE, "src")?,
                    price: Some(price),
                    bids: select_text(item, selectors::ITEM_BIDS)?,
                    buy_it_now,
                    time_left: select_text(item, selectors::ITEM_TIME_LEFT)?,
                },
            )?);
        }

        if items_seen == 0 && document.select(&selector(selectors::RESULTS)?).next().is_none() {
            return Err(SourceError::Malformed(
                "search page has neither results nor a results container".into(),
            ));
        }

        tracing::debug!(items_seen, listings = listings.len(), "Parsed search results.");
        Ok(listings)
    }

    /// Parses a single item page. Returns `None` for pages without a
    /// recognisable listing.
    pub fn parse_item_page(&self, key: &str, html: &str) -> Result<Option<Entity>, SourceError> {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let title = select_attr(root, selectors::PAGE_TITLE, "content")?;
        let image = select_attr(root, selectors::PAGE_IMAGE, "content")?;

        let summary = root.select(&selector(selectors::SUMMARY_PANEL)?).next();
        let raw = match summary {
            Some(panel) => RawListing {
                title,
                image,
                price: select_text(panel, selectors::SUMMARY_PRICE)?,
                bids: select_text(panel, selectors::SUMMARY_BIDS)?,
                buy_it_now: select_text(panel, selectors::SUMMARY_BUY_IT_NOW)?,
                time_left: select_text(panel, selectors::SUMMARY_TIME_LEFT)?,
            },
            None => {
                let Some(content) = root.select(&selector(selectors::ENDED_CONTENT)?).next()
                else {
                    return Ok(None);
                };
                RawListing {
                    title,
                    image,
                    price: select_text(content, selectors::ENDED_PRICE)?,
                    bids: select_text(content, selectors::ENDED_BIDS)?,
                    buy_it_now: None,
                    time_left: Some("-".to_string()),
                }
            }
        };

        self.listing(key, raw).map(Some)
    }

    fn listing(&self, key: &str, raw: RawListing) -> Result<Entity, SourceError> {
        let bids = parse_bids(raw.bids.as_deref())?;
        let price = parse_price(raw.price.as_deref())?;
        let time_left = raw.time_left.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let ends_within_24h = time_left.is_some_and(|t| !first_word_ends_with(t, 'd'));
        let ends_within_1h =
            ends_within_24h && time_left.is_some_and(|t| !first_word_ends_with(t, 'h'));
        let ended = ends_within_1h && time_left == Some("-");

        let mut entity = Entity::new(key)
            .with(attr::LINK, self.item_url(key)?.to_string())
            .with(attr::BIDS, bids)
            .with(attr::PRICE, price)
            .with(
                attr::TIME_LEFT,
                time_left.map_or_else(|| "No End Date".to_string(), |t| t.replace(" left", "")),
            )
            .with(attr::BUY_IT_NOW, raw.buy_it_now.is_some_and(|b| !b.trim().is_empty()))
            .with(attr::ENDS_WITHIN_24H, ends_within_24h)
            .with(attr::ENDS_WITHIN_1H, ends_within_1h)
            .with(attr::ENDED, ended);
        if let Some(title) = raw.title {
            entity = entity.with(attr::TITLE, title.trim());
        }
        if let Some(image) = raw.image {
            entity = entity.with(attr::IMAGE, image);
        }
        Ok(entity)
    }
}

#[async_trait]
impl SnapshotSource for EbayListingsSource {
    #[tracing::instrument(skip(self), fields(seller = %self.seller), level = "info")]
    async fn fetch_snapshot(&self) -> Result<Vec<Entity>, SourceError> {
        let html = self.load_page(self.search_url()?).await?;
        let listings = self.parse_listings(&html)?;
        tracing::info!(count = listings.len(), "Fetched eBay listings.");
        Ok(listings)
    }

    #[tracing::instrument(skip(self), level = "info")]
    async fn fetch_entity(&self, key: &EntityKey) -> Result<Option<Entity>, SourceError> {
        let html = self.load_page(self.item_url(key.as_str())?).await?;
        self.parse_item_page(key.as_str(), &html)
    }
}

/// Unparsed text fields of one listing.
struct RawListing {
    title: Option<String>,
    image: Option<String>,
    price: Option<String>,
    bids: Option<String>,
    buy_it_now: Option<String>,
    time_left: Option<String>,
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Malformed(format!("bad selector '{css}': {e}")))
}

/// The first non-blank direct text child of the first element matching `css`.
fn select_text(scope: ElementRef<'_>, css: &str) -> Result<Option<String>, SourceError> {
    let selector = selector(css)?;
    Ok(scope.select(&selector).next().and_then(|el| {
        el.children().find_map(|node| {
            node.value()
                .as_text()
                .map(|text| text.trim())
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        })
    }))
}

fn select_attr(
    scope: ElementRef<'_>,
    css: &str,
    name: &str,
) -> Result<Option<String>, SourceError> {
    let selector = selector(css)?;
    Ok(scope.select(&selector).next().and_then(|el| el.value().attr(name)).map(str::to_string))
}

/// Extracts `123` from `https://www.ebay.co.uk/itm/some-title/123?hash=...`.
fn item_number(href: &str) -> String {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default().to_string()
}

fn parse_bids(text: Option<&str>) -> Result<i64, SourceError> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(0);
    };
    let digits = text.replace("bids", "").replace("bid", "");
    digits
        .trim()
        .parse()
        .map_err(|_| SourceError::Malformed(format!("unparseable bid count '{text}'")))
}

/// Parses `£1,234.50`; for ranges such as `£5.00 to £9.00` the lower bound.
fn parse_price(text: Option<&str>) -> Result<f64, SourceError> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(0.0);
    };
    let lower = text.split(" to ").next().unwrap_or(text);
    let cleaned: String = lower.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    cleaned
        .parse()
        .map_err(|_| SourceError::Malformed(format!("unparseable price '{text}'")))
}

fn first_word_ends_with(text: &str, unit: char) -> bool {
    text.split(' ').next().is_some_and(|word| word.ends_with(unit))
}

/// The rule table of an eBay poller.
///
/// `bid` and `ended` are confirmed against the item page before notifying, so
/// their messages show the page's figures rather than the search results'.
pub fn default_rules() -> Result<RuleSet, RuleSetError> {
    const TITLE: &str = "{{ item.title | default(key) }}";

    RuleSet::new(vec![
        Rule::new_entity(
            "new_listing",
            NotificationMessage::new(
                "New eBay Listing - {{ item.title }}",
                format!(
                    "New eBay Listing\n\n{{{{ item.title }}}}\n\n\
                     Time Left: {{{{ item.time_left }}}}\n\
                     Buy It Now: {{{{ 'Yes' if item.buy_it_now else 'No' }}}}\n\
                     Price: £{{{{ item.price | money }}}}\nLink: {LINK}"
                ),
            )
            .with_html(listing_html(
                "New eBay Listing",
                "<p>Time Left: {{ item.time_left }}</p>\
                 <p>Buy It Now: {{ 'Yes' if item.buy_it_now else 'No' }}</p>\
                 <p>Price: £{{ item.price | money }}</p>",
            )),
        ),
        Rule::threshold(
            "ending_24_hour",
            |e| e.flag(attr::ENDS_WITHIN_24H),
            ending_message("eBay Listing Ends Tomorrow"),
        ),
        Rule::threshold(
            "ending_1_hour",
            |e| e.flag(attr::ENDS_WITHIN_1H),
            ending_message("eBay Listing 1 Hour Left"),
        ),
        Rule::scalar_change(
            "bid",
            &[attr::BIDS, attr::PRICE],
            NotificationMessage::new(
                "eBay Listing Bid - {{ item.title }}",
                format!(
                    "eBay Listing Bid\n\n{{{{ item.title }}}}\n\n\
                     Time Left: {{{{ item.time_left }}}}\n\
                     Old Bids: {{{{ old.bids }}}}\nOld Price: £{{{{ old.price | money }}}}\n\
                     Bids: {{{{ new.bids }}}}\nPrice: £{{{{ new.price | money }}}}\nLink: {LINK}"
                ),
            )
            .with_html(listing_html(
                "eBay Listing Bid",
                "<p>Time Left: {{ item.time_left }}</p>\
                 <p>Old Bids: {{ old.bids }}</p><p>Old Price: £{{ old.price | money }}</p>\
                 <p>Bids: {{ new.bids }}</p><p>Price: £{{ new.price | money }}</p>",
            )),
        )
        .confirmed(),
        Rule::scalar_change(
            "title",
            &[attr::TITLE],
            NotificationMessage::new(
                "eBay Listing Renamed - {{ new.title }}",
                format!(
                    "eBay Listing Renamed\n\nOld Title: {{{{ old.title }}}}\n\
                     New Title: {{{{ new.title }}}}\nLink: {LINK}"
                ),
            ),
        ),
        Rule::finished(
            "ended",
            NotificationMessage::new(
                format!("eBay Listing Ended - {TITLE}"),
                format!(
                    "{{% if item.bids | default(0) > 0 %}}eBay Listing Ended (Sold)\n\n\
                     {TITLE}\n\nBids: {{{{ item.bids }}}}\n\
                     Price: £{{{{ item.price | default(0) | money }}}}\n\
                     {{% else %}}eBay Listing Ended (Unsold)\n\n{TITLE}\n\
                     No bids seen before ending.\n{{% endif %}}Link: {LINK}"
                ),
            )
            .with_html(listing_html(
                "eBay Listing Ended \
                 ({{ 'Sold' if item.bids | default(0) > 0 else 'Unsold' }})",
                "{% if item.bids | default(0) > 0 %}<p>Bids: {{ item.bids }}</p>\
                 <p>Price: £{{ item.price | default(0) | money }}</p>\
                 {% else %}<p>No bids seen before ending.</p>{% endif %}",
            )),
        )
        .confirmed(),
    ])
}

fn ending_message(heading: &str) -> NotificationMessage {
    NotificationMessage::new(
        format!("{heading} - {{{{ item.title }}}}"),
        format!(
            "{heading}\n\n{{{{ item.title }}}}\n\nTime Left: {{{{ item.time_left }}}}\n\
             Bids: {{{{ item.bids }}}}\nPrice: £{{{{ item.price | money }}}}\nLink: {LINK}"
        ),
    )
    .with_html(listing_html(
        heading,
        "<p>Time Left: {{ item.time_left }}</p><p>Bids: {{ item.bids }}</p>\
         <p>Price: £{{ item.price | money }}</p>",
    ))
}

/// The HTML layout shared by every eBay message: heading and title, then
/// the image beside the details, then a link to the listing.
fn listing_html(heading: &str, details: &str) -> String {
    let mut html = format!("<h1>{heading}</h1><h2>{{{{ item.title | default(key) | e }}}}</h2>");
    html.push_str("<table><tr><td>");
    html.push_str(r#"{% if item.image is defined %}<img src="{{ item.image }}"/>{% endif %}"#);
    html.push_str(&format!("</td><td>{details}</td></tr></table>"));
    html.push_str(&format!(r#"<p><a href="{LINK}">View Listing</a></p>"#));
    html
}
