//! Provider resource names and the allow-list the relay serves.

// self
use crate::_prelude::*;

macro_rules! def_resources {
	($($variant:ident => $path:literal),+ $(,)?) => {
		/// Metadata provider resource addressed by `{base_url}/{resource}`.
		#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(rename_all = "snake_case")]
		pub enum ResourceName {
			$(
				#[doc = concat!("The `", $path, "` endpoint.")]
				$variant,
			)+
		}
		impl ResourceName {
			/// Every resource the relay knows how to address.
			pub const ALL: &'static [ResourceName] = &[$(ResourceName::$variant),+];

			/// Returns the provider path segment for the resource.
			pub const fn as_str(self) -> &'static str {
				match self {
					$(ResourceName::$variant => $path,)+
				}
			}
		}
		impl FromStr for ResourceName {
			type Err = UnknownResource;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				match s {
					$($path => Ok(ResourceName::$variant),)+
					other => Err(UnknownResource { name: other.to_owned() }),
				}
			}
		}
	};
}

def_resources! {
	Games => "games",
	Genres => "genres",
	Platforms => "platforms",
	Covers => "covers",
	Screenshots => "screenshots",
	Artworks => "artworks",
	Companies => "companies",
	Franchises => "franchises",
	GameModes => "game_modes",
	Themes => "themes",
	ReleaseDates => "release_dates",
	Websites => "websites",
	GameVideos => "game_videos",
	Search => "search",
}

impl Display for ResourceName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Error returned when a path segment does not name a known resource.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown resource `{name}`.")]
pub struct UnknownResource {
	/// Path segment that failed to parse.
	pub name: String,
}

/// Set of resources the relay forwards; everything else is refused at the boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceAllowList(BTreeSet<ResourceName>);
impl ResourceAllowList {
	/// Resources served by default: the ones the game library client queries.
	pub const DEFAULT: &'static [ResourceName] =
		&[ResourceName::Games, ResourceName::Genres, ResourceName::Platforms];

	/// Creates an allow-list from the provided resources.
	pub fn new<I>(resources: I) -> Self
	where
		I: IntoIterator<Item = ResourceName>,
	{
		Self(resources.into_iter().collect())
	}

	/// Allow-list containing every known resource.
	pub fn all() -> Self {
		Self::new(ResourceName::ALL.iter().copied())
	}

	/// Parses a comma-separated list such as `games, genres,platforms`.
	///
	/// Blank entries are skipped; an input with no entries is rejected.
	pub fn parse_list(raw: &str) -> Result<Self, UnknownResource> {
		let mut set = BTreeSet::new();

		for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
			set.insert(entry.parse::<ResourceName>()?);
		}

		if set.is_empty() {
			return Err(UnknownResource { name: raw.trim().to_owned() });
		}

		Ok(Self(set))
	}

	/// Returns `true` when `resource` may be forwarded.
	pub fn allows(&self, resource: ResourceName) -> bool {
		self.0.contains(&resource)
	}

	/// Resolves a raw path segment into an allowed resource.
	pub fn resolve(&self, raw: &str) -> Option<ResourceName> {
		raw.parse::<ResourceName>().ok().filter(|resource| self.allows(*resource))
	}

	/// Iterates the allowed resources in a stable order.
	pub fn iter(&self) -> impl Iterator<Item = ResourceName> + '_ {
		self.0.iter().copied()
	}
}
impl Default for ResourceAllowList {
	fn default() -> Self {
		Self::new(Self::DEFAULT.iter().copied())
	}
}
impl Display for ResourceAllowList {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		for (idx, resource) in self.iter().enumerate() {
			if idx > 0 {
				f.write_str(",")?;
			}

			f.write_str(resource.as_str())?;
		}

		Ok(())
	}
}
