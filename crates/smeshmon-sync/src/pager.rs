use std::future::Future;

use smeshmon_rpc::{RpcError, SmesherApi};
use smeshmon_types::{Identity, Reward};

/// Cap on follow-up requests for offset-paged lists
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Collect an offset-paged list, requesting the next page while pages come back full
pub async fn fetch_all_pages<T, E, F, Fut>(
    page_size: usize,
    max_pages: usize,
    mut fetch: F,
) -> std::result::Result<Vec<T>, E>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = std::result::Result<Vec<T>, E>>,
{
    let page_size = page_size.max(1);
    let mut all = Vec::new();
    for page in 0..max_pages.max(1) {
        let chunk = fetch(page_size, page * page_size).await?;
        let full = chunk.len() == page_size;
        all.extend(chunk);
        if !full {
            break;
        }
    }
    Ok(all)
}

pub async fn fetch_all_rewards<A: SmesherApi + ?Sized>(
    api: &A,
    identity: &Identity,
    page_size: usize,
    max_pages: usize,
) -> std::result::Result<Vec<Reward>, RpcError> {
    fetch_all_pages(page_size, max_pages, move |limit, offset| {
        api.rewards_chunk(identity, limit, offset)
    })
    .await
}
