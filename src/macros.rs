//===========================================================================//

macro_rules! invalid_format {
    ($e:expr) => {
        return Err($crate::error::Error::InvalidFormat(
            ::std::string::String::from($e),
        ))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::error::Error::InvalidFormat(
            format!($fmt, $($arg)+),
        ))
    };
}

macro_rules! missing_data {
    ($e:expr) => {
        return Err($crate::error::Error::MissingData(
            ::std::string::String::from($e),
        ))
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::error::Error::MissingData(
            format!($fmt, $($arg)+),
        ))
    };
}

//===========================================================================//
