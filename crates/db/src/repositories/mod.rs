mod template_repo;

pub use template_repo::TemplateRepo;
