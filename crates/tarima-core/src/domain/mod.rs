pub mod album;
pub mod artist;
pub mod ids;
pub mod image;
pub mod song;
pub mod status;
pub mod tags;

pub use album::Album;
pub use artist::{Artist, THEATER, VARIOUS_ARTISTS};
pub use ids::{AlbumId, SongId};
pub use image::{ImageInfo, PictureIdentifier};
pub use song::Song;
pub use status::{AlbumStatus, AlbumStatusReasons, Severity, ValidationMessage, ValidationOutcome};
pub use tags::{MetaTag, MetaTagIdentifier, TagSet};
