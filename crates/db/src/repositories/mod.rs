mod archive_repository;

pub use archive_repository::SessionArchiveRepository;
