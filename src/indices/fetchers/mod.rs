pub mod argentina_datos;
pub mod bcra_icl;
pub mod dolar_api;

pub use argentina_datos::ArgentinaDatosFetcher;
pub use bcra_icl::BcraIclFetcher;
pub use dolar_api::DolarApiFetcher;
