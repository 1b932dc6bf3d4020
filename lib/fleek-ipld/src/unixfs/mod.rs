mod proto;

use std::io;

pub use proto::unixfs::mod_Data::DataType;
pub use proto::unixfs::{Data, Metadata, UnixTime};
use quick_protobuf::{BytesReader, MessageRead, MessageWrite, Writer};

impl<'a> TryFrom<&'a [u8]> for Data<'a> {
    type Error = io::Error;

    fn try_from(data: &'a [u8]) -> Result<Self, Self::Error> {
        Data::from_reader(&mut BytesReader::from_bytes(data), data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl<'a> Data<'a> {
    /// Serialize the message without a length prefix, this is the form stored in the `Data` field
    /// of a DAG-PB node.
    pub fn to_bytes(&self) -> Result<Vec<u8>, quick_protobuf::Error> {
        let mut buf = Vec::with_capacity(self.get_size());
        let mut writer = Writer::new(&mut buf);
        self.write_message(&mut writer)?;
        Ok(buf)
    }
}
