pub mod filesystem;
pub mod observer;
pub mod plugins;
pub mod search;
pub mod serializer;
pub mod validation;

pub use filesystem::FileSystem;
pub use observer::{NoopObserver, ProcessingObserver};
pub use plugins::{ConversionOutcome, ConversionPlugin, DirectoryPlugin, DirectoryPluginOutcome, SongTagReader, SongTagWriter};
pub use search::{AlbumImageQuery, AlbumImageResult, AlbumImageSearch, ArtistSearch, ArtistSearchQuery, ArtistSearchResult, ReleaseMatch};
pub use serializer::AlbumSerializer;
pub use validation::{AlbumValidator, ImageCheck, ImageInspector};
