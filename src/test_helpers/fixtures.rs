/// One search result item in the markup of an eBay results page.
pub fn ebay_result_item(id: u64, title: &str, price: &str, bids: &str, time_left: &str) -> String {
    format!(
        r#"<li><div class="s-item__wrapper">
            <div class="s-item__image"><a href="/itm/{id}?hash=item{id}">img</a></div>
            <div class="s-item__image-wrapper">
                <img class="s-item__image-img" src="https://i.ebayimg.com/{id}.jpg">
            </div>
            <div class="s-item__title"><span>{title}</span></div>
            <div class="s-item__detail"><span class="s-item__price">{price}</span></div>
            <div class="s-item__detail"><span class="s-item__bids">{bids}</span></div>
            <div class="s-item__detail"><span class="s-item__time-left">{time_left}</span></div>
        </div></li>"#
    )
}

/// A complete eBay results page containing `items`.
pub fn ebay_results_page(items: &[String]) -> String {
    format!(r#"<html><body><ul class="srp-results">{}</ul></body></html>"#, items.join(""))
}

/// The item page of a listing that is still running.
pub fn ebay_item_page(id: u64, title: &str, price: &str, bids: &str, time_left: &str) -> String {
    format!(
        r#"<html><head>
            <meta name="twitter:title" content="{title}">
            <meta name="twitter:image" content="https://i.ebayimg.com/{id}.jpg">
        </head><body><div id="LeftSummaryPanel">
            <div class="x-price-primary"><span class="ux-textspans">{price}</span></div>
            <div class="x-bid-count"><span class="ux-textspans">{bids}</span></div>
            <span class="ux-timer__text">{time_left}</span>
        </div></body></html>"#
    )
}

/// The item page of a listing that has ended.
pub fn ebay_ended_item_page(id: u64, title: &str, price: &str, bids: &str) -> String {
    format!(
        r#"<html><head>
            <meta name="twitter:title" content="{title}">
            <meta name="twitter:image" content="https://i.ebayimg.com/{id}.jpg">
        </head><body><div id="mainContent">
            <div class="vi-price-np"><span class="vi-VR-cvipPrice">{price}</span></div>
            <div class="vi-cvip-bidt1"><a><span>{bids}</span></a></div>
        </div></body></html>"#
    )
}
