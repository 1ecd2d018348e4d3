pub(crate) mod consts;
mod init;

pub(crate) use init::init;
