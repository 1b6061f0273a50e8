//! Tour source contract.
//!
//! A [`TourSource`] lists tour records for an owner and downloads raw track
//! text. Listing is paginated; [`collect_pages`] drives the page loop and
//! [`apply_filter`] applies the status and creator filters the remote API
//! cannot express.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tour::{TourRecord, TourStatus, TourType};

/// Whose tours to list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TourOwner {
    /// The authenticated account
    Me,
    /// Another user, by id
    User(String),
}

/// Restrict listings to tours created by the account itself or by others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CreatorFilter {
    #[default]
    Any,
    SelfOnly,
    OthersOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TourFilter {
    pub tour_type: Option<TourType>,
    /// Empty means every status
    pub status: Vec<TourStatus>,
    pub creator: CreatorFilter,
}

impl TourFilter {
    pub fn planned() -> Self {
        Self {
            tour_type: Some(TourType::Planned),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TourStatus) -> Self {
        self.status.push(status);
        self
    }

    pub fn with_creator(mut self, creator: CreatorFilter) -> Self {
        self.creator = creator;
        self
    }
}

/// One page of a tour listing.
#[derive(Debug, Clone, Default)]
pub struct TourPage {
    pub tours: Vec<TourRecord>,
    pub total_elements: u64,
    pub total_pages: u32,
}

/// Something that can list tours and hand out their track files.
pub trait TourSource {
    /// All tours of `owner` matching `filter`, across every page.
    fn list_tours(&self, owner: &TourOwner, filter: &TourFilter) -> Result<Vec<TourRecord>>;

    /// Raw track text for a tour, or `None` when the source has no track.
    fn fetch_track(&self, tour_id: &str) -> Result<Option<String>>;
}

/// Fetch pages starting at 0 until the listing reports completion.
///
/// An empty listing (`total_elements == 0`) ends the loop immediately; otherwise
/// the loop stops once the next page index equals `total_pages`. Any page error
/// aborts the whole listing so a truncated result is never mistaken for a full one.
pub fn collect_pages<F>(mut fetch_page: F) -> Result<Vec<TourRecord>>
where
    F: FnMut(u32) -> Result<TourPage>,
{
    let mut tours = Vec::new();
    let mut page = 0u32;

    loop {
        let result = fetch_page(page)?;
        if result.total_elements == 0 {
            break;
        }
        tours.extend(result.tours);
        page += 1;
        if page >= result.total_pages {
            break;
        }
    }

    debug!("[TourSource] Collected {} tours over {} pages", tours.len(), page);
    Ok(tours)
}

/// Keep only tours matching the status and creator restrictions.
///
/// Entries that failed to decode are always kept so the import reports them.
pub fn apply_filter(
    tours: Vec<TourRecord>,
    filter: &TourFilter,
    self_user_id: Option<&str>,
) -> Vec<TourRecord> {
    tours
        .into_iter()
        .filter(|tour| tour.decode_error.is_some() || matches_filter(tour, filter, self_user_id))
        .collect()
}

fn matches_filter(tour: &TourRecord, filter: &TourFilter, self_user_id: Option<&str>) -> bool {
    let status_ok = filter.status.is_empty()
        || tour.status.map_or(false, |s| filter.status.contains(&s));
    let creator_ok = match filter.creator {
        CreatorFilter::Any => true,
        CreatorFilter::SelfOnly => {
            self_user_id.is_some() && tour.creator_username() == self_user_id
        }
        CreatorFilter::OthersOnly => tour.creator_username() != self_user_id,
    };
    status_ok && creator_ok
}
