use log::debug;
use serde::ser;

use crate::error::{Error, Result};
use crate::ser::Serializer;
use crate::str::escape_into;

pub(crate) struct SerializeStruct<'a, 'b> {
    ser: &'a mut Serializer<'b>,
    first: bool,
    // inside `{"Variant":{ ... }}`
    variant: bool,
}

impl<'a, 'b> SerializeStruct<'a, 'b> {
    pub(crate) fn new(ser: &'a mut Serializer<'b>, variant: bool) -> Self {
        SerializeStruct {
            ser,
            first: true,
            variant,
        }
    }

    fn field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ser::Serialize,
    {
        let mark = self.ser.buf.len();
        let depth = self.ser.depth;
        let first = self.first;

        if !self.first {
            self.ser.buf.push(',');
        }
        self.first = false;

        escape_into(self.ser.buf, key);
        self.ser.buf.push(':');

        match value.serialize(&mut *self.ser) {
            Err(Error::Access(reason)) if self.ser.options.is_lenient() => {
                debug!("skipping unreadable member `{}`: {}", key, reason);
                self.ser.buf.truncate(mark);
                self.ser.depth = depth;
                self.first = first;
                Ok(())
            }
            other => other,
        }
    }

    fn close(self) -> Result<()> {
        self.ser.buf.push('}');
        self.ser.leave();
        if self.variant {
            self.ser.buf.push('}');
            self.ser.leave();
        }
        Ok(())
    }
}

impl<'a, 'b> ser::SerializeStruct for SerializeStruct<'a, 'b> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ser::Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<Self::Ok> {
        self.close()
    }
}

impl<'a, 'b> ser::SerializeStructVariant for SerializeStruct<'a, 'b> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ser::Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<Self::Ok> {
        self.close()
    }
}
