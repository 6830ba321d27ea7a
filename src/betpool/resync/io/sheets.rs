use crate::betpool::resync::error::Result;
use crate::betpool::resync::model::RawRow;

/// Read side of the spreadsheet that holds the source of truth.
pub trait SheetSource {
    /// Returns every data row of the named sheet, header row excluded.
    fn list_rows(&self, sheet: &str) -> Result<Vec<RawRow>>;
}

impl<S: SheetSource + ?Sized> SheetSource for &S {
    fn list_rows(&self, sheet: &str) -> Result<Vec<RawRow>> {
        (**self).list_rows(sheet)
    }
}
