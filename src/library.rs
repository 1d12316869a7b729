//! Conversion from provider game records into the client's library shape.
//!
//! The relay itself never rewrites responses. These types describe what the game-library
//! client stores after picking a game from a relayed `games` query, so callers embedding
//! the crate can perform the same conversion on the Rust side.

// crates.io
use time::serde::{rfc3339, timestamp};
// self
use crate::{_prelude::*, error::UpstreamError, resource::ResourceName};

/// Where a game sits in the player's library.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
	/// Currently being played.
	Playing,
	/// Finished.
	Completed,
	/// Owned or wanted but not started.
	#[default]
	Backlog,
	/// Abandoned.
	Dropped,
}

/// Ownership details for one platform a game is available on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformOwnership {
	/// Platform name as reported by the provider.
	pub platform: String,
	/// Whether the player owns the game on this platform.
	pub owned: bool,
	/// Store the copy came from.
	#[serde(default)]
	pub storefront: Option<String>,
	/// Subscription granting access.
	#[serde(default)]
	pub subscription_service: Option<String>,
	/// Purchase date as entered by the player.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub purchase_date: Option<String>,
	/// Price paid.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub purchase_price: Option<f64>,
	/// Free-form notes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

/// A game as persisted by the library client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryRecord {
	/// Provider game id.
	pub id: u64,
	/// Display name.
	pub name: String,
	/// Absolute `https` URL of the large cover image.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cover: Option<String>,
	/// Provider summary.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub summary: Option<String>,
	/// Genre names.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub genres: Option<Vec<String>>,
	/// Platform names.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platforms: Option<Vec<String>>,
	/// Per-platform ownership, filled in by the player.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform_ownership: Option<Vec<PlatformOwnership>>,
	/// First release date.
	#[serde(default, skip_serializing_if = "Option::is_none", with = "rfc3339::option")]
	pub release_date: Option<OffsetDateTime>,
	/// Critic rating, falling back to the user rating.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rating: Option<f64>,
	/// Hours played.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub playtime: Option<f64>,
	/// Library status.
	pub status: GameStatus,
	/// When the game entered the library.
	#[serde(with = "rfc3339")]
	pub added_date: OffsetDateTime,
	/// Free-form player notes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Whether the game is on the wishlist.
	#[serde(default)]
	pub wishlisted: bool,
}
impl LibraryRecord {
	/// Converts one provider `games` record, stamping it as added at `added_at`.
	///
	/// Only `id` and `name` are required; every other field is optional upstream and
	/// stays `None` when absent.
	pub fn from_upstream(record: &Value, added_at: OffsetDateTime) -> Result<Self> {
		let game: UpstreamGame = serde_path_to_error::deserialize(record)
			.map_err(|source| UpstreamError::Decode { resource: ResourceName::Games, source })?;

		Ok(Self {
			id: game.id,
			name: game.name,
			cover: game.cover.and_then(|cover| cover.url).map(|url| large_cover_url(&url)),
			summary: game.summary,
			genres: game.genres.map(named_list),
			platforms: game.platforms.map(named_list),
			platform_ownership: None,
			// The provider reports unknown dates as `0`.
			release_date: game.first_release_date.filter(|date| date.unix_timestamp() != 0),
			rating: game.aggregated_rating.filter(|rating| *rating != 0.0).or(game.rating),
			playtime: None,
			status: GameStatus::Backlog,
			added_date: added_at,
			notes: None,
			wishlisted: false,
		})
	}

	/// Converts every record of a relayed `games` response.
	pub fn from_upstream_records(records: &[Value], added_at: OffsetDateTime) -> Result<Vec<Self>> {
		records.iter().map(|record| Self::from_upstream(record, added_at)).collect()
	}
}

#[derive(Debug, Deserialize)]
struct UpstreamGame {
	id: u64,
	name: String,
	#[serde(default)]
	cover: Option<UpstreamImage>,
	#[serde(default)]
	summary: Option<String>,
	#[serde(default)]
	genres: Option<Vec<Named>>,
	#[serde(default)]
	platforms: Option<Vec<Named>>,
	#[serde(default, with = "timestamp::option")]
	first_release_date: Option<OffsetDateTime>,
	#[serde(default)]
	rating: Option<f64>,
	#[serde(default)]
	aggregated_rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct UpstreamImage {
	#[serde(default)]
	url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
	#[serde(default)]
	name: Option<String>,
}

/// Provider image URLs are protocol-relative thumbnails.
fn large_cover_url(url: &str) -> String {
	let url = url.replacen("t_thumb", "t_cover_big", 1);

	if url.starts_with("//") { format!("https:{url}") } else { url }
}

fn named_list(items: Vec<Named>) -> Vec<String> {
	items.into_iter().filter_map(|item| item.name).collect()
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	use time::macros::datetime;
	// self
	use super::*;

	const ADDED: OffsetDateTime = datetime!(2025-01-02 03:04:05 UTC);

	#[test]
	fn converts_a_full_game_record() {
		let record = json!({
			"id": 1942,
			"name": "The Witcher 3: Wild Hunt",
			"cover": {"id": 89386, "url": "//images.igdb.com/igdb/image/upload/t_thumb/co1wyy.jpg"},
			"summary": "RPG",
			"genres": [{"id": 12, "name": "Role-playing (RPG)"}, {"id": 31, "name": "Adventure"}],
			"platforms": [{"id": 6, "name": "PC (Microsoft Windows)"}],
			"first_release_date": 1431993600,
			"rating": 93.1,
			"aggregated_rating": 92.4
		});
		let game =
			LibraryRecord::from_upstream(&record, ADDED).expect("Full record should convert.");

		assert_eq!(game.id, 1942);
		assert_eq!(
			game.cover.as_deref(),
			Some("https://images.igdb.com/igdb/image/upload/t_cover_big/co1wyy.jpg")
		);
		assert_eq!(
			game.genres,
			Some(vec!["Role-playing (RPG)".to_owned(), "Adventure".to_owned()])
		);
		assert_eq!(game.release_date, Some(datetime!(2015-05-19 00:00:00 UTC)));
		assert_eq!(game.rating, Some(92.4));
		assert_eq!(game.status, GameStatus::Backlog);
		assert!(!game.wishlisted);
	}

	#[test]
	fn optional_fields_stay_absent() {
		let game = LibraryRecord::from_upstream(&json!({"id": 7, "name": "Foo", "rating": 70.0}), ADDED)
			.expect("Minimal record should convert.");
		let rendered = serde_json::to_value(&game).expect("Record should serialize.");

		assert_eq!(game.rating, Some(70.0));
		assert_eq!(
			rendered,
			json!({
				"id": 7,
				"name": "Foo",
				"rating": 70.0,
				"status": "backlog",
				"addedDate": "2025-01-02T03:04:05Z",
				"wishlisted": false
			})
		);
	}

	#[test]
	fn zero_release_dates_are_absent() {
		let game = LibraryRecord::from_upstream(
			&json!({"id": 8, "name": "Undated", "first_release_date": 0}),
			ADDED,
		)
		.expect("Undated record should convert.");

		assert_eq!(game.release_date, None);
	}

	#[test]
	fn response_batches_convert_in_order_and_fail_as_a_whole() {
		let records = [json!({"id": 1, "name": "Foo"}), json!({"id": 2, "name": "Bar"})];
		let games = LibraryRecord::from_upstream_records(&records, ADDED)
			.expect("Every record in the batch should convert.");

		assert_eq!(games.iter().map(|game| game.id).collect::<Vec<_>>(), [1, 2]);
		assert!(games.iter().all(|game| game.added_date == ADDED));

		let broken = [json!({"id": 1, "name": "Foo"}), json!({"id": "two"})];

		assert!(LibraryRecord::from_upstream_records(&broken, ADDED).is_err());
	}

	#[test]
	fn records_without_identity_are_rejected() {
		let err = LibraryRecord::from_upstream(&json!({"name": "Nameless"}), ADDED)
			.expect_err("Records without an id should fail.");

		assert!(matches!(err, Error::Upstream(UpstreamError::Decode { .. })));
	}

	#[test]
	fn persisted_records_deserialize() {
		let game: LibraryRecord = serde_json::from_value(json!({
			"id": 3,
			"name": "Bar",
			"status": "playing",
			"addedDate": "2024-06-01T12:00:00Z",
			"platformOwnership": [
				{"platform": "PlayStation 5", "owned": true, "storefront": "PlayStation Store", "subscriptionService": null}
			]
		}))
		.expect("Persisted record should deserialize.");
		let ownership = game.platform_ownership.expect("Ownership should be present.");

		assert_eq!(game.status, GameStatus::Playing);
		assert_eq!(ownership[0].storefront.as_deref(), Some("PlayStation Store"));
		assert!(ownership[0].subscription_service.is_none());
	}
}
