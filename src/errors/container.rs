use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug)]
pub enum ContainerErrorKind {
    #[error("Provider for {type_info} is already registered in this container")]
    DuplicateProvider { type_info: TypeInfo },
}
